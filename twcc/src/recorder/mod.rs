
use crate::transport_layer_cc::{
    DeltaWidth, PacketStatusChunk, PacketStatusSymbol, RecvDelta, RunLengthChunk, StatusVectorChunk,
    SymbolSize, TransportLayerCc, MAX_RUN_LENGTH,
};

/// Unit of the reference time field, in us.
const REFERENCE_TIME_SCALE_FACTOR: i64 = 64000;
const REFERENCE_TIME_MASK: u32 = 0x00ff_ffff;

const MAX_RUN_LENGTH_CAP: usize = MAX_RUN_LENGTH as usize;
const MAX_ONE_BIT_CAP: usize = 14;
const MAX_TWO_BIT_CAP: usize = 7;

#[derive(Default, Debug, PartialEq, Eq, Clone)]
struct ReceivedPacket {
    /// Transport wide sequence number extended with the wrap-around count.
    sequence_number: u32,
    arrival_time_us: i64,
}

/// Recorder collects the arrival times of transport wide sequenced packets
/// and turns them into [`TransportLayerCc`] feedback reports.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Recorder {
    received_packets: Vec<ReceivedPacket>,

    cycles: u32,
    last_sequence_number: u16,

    sender_ssrc: u32,
    media_ssrc: u32,
    fb_pkt_count: u8,
}

impl Recorder {
    /// Creates a Recorder whose reports carry `sender_ssrc`.
    pub fn new(sender_ssrc: u32) -> Self {
        Recorder {
            sender_ssrc,
            ..Default::default()
        }
    }

    /// Marks the packet with transport wide `sequence_number` as received
    /// at `arrival_time_us`.
    pub fn record(&mut self, media_ssrc: u32, sequence_number: u16, arrival_time_us: i64) {
        self.media_ssrc = media_ssrc;
        if sequence_number < 0x0fff && self.last_sequence_number > 0xf000 {
            self.cycles += 1 << 16;
        }
        self.received_packets.push(ReceivedPacket {
            sequence_number: self.cycles | sequence_number as u32,
            arrival_time_us,
        });
        self.last_sequence_number = sequence_number;
    }

    /// Builds feedback for everything recorded since the last call. Nothing
    /// is built, and nothing is dropped, until at least two packets are known.
    pub fn build_feedback_packet(&mut self) -> Vec<TransportLayerCc> {
        if self.received_packets.len() < 2 {
            return vec![];
        }

        self.received_packets.sort_by_key(|pkt| pkt.sequence_number);
        // a retransmitted sequence number keeps its first arrival
        self.received_packets.dedup_by_key(|pkt| pkt.sequence_number);

        let mut feedback = self.next_feedback();
        let first = &self.received_packets[0];
        feedback.set_base(first.sequence_number as u16, first.arrival_time_us);

        let mut pkts = vec![];
        for i in 0..self.received_packets.len() {
            let ReceivedPacket {
                sequence_number,
                arrival_time_us,
            } = self.received_packets[i];
            let sequence_number = sequence_number as u16;

            if !feedback.add_received(sequence_number, arrival_time_us) {
                log::debug!(
                    "twcc delta for sequence number {} does not fit, starting feedback packet {}",
                    sequence_number,
                    self.fb_pkt_count
                );
                pkts.push(feedback.into_packet());

                feedback = self.next_feedback();
                feedback.set_base(sequence_number, arrival_time_us);
                feedback.add_received(sequence_number, arrival_time_us);
            }
        }
        self.received_packets.clear();

        pkts.push(feedback.into_packet());
        pkts
    }

    fn next_feedback(&mut self) -> Feedback {
        let feedback = Feedback::new(self.sender_ssrc, self.media_ssrc, self.fb_pkt_count);
        self.fb_pkt_count = self.fb_pkt_count.wrapping_add(1);
        feedback
    }
}

/// One feedback packet under construction.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
struct Feedback {
    sender_ssrc: u32,
    media_ssrc: u32,
    fb_pkt_count: u8,

    base_sequence_number: u16,
    ref_timestamp64ms: i64,
    last_timestamp_us: i64,
    next_sequence_number: u16,
    sequence_number_count: u16,

    last_chunk: Chunk,
    chunks: Vec<PacketStatusChunk>,
    deltas: Vec<RecvDelta>,
}

impl Feedback {
    fn new(sender_ssrc: u32, media_ssrc: u32, fb_pkt_count: u8) -> Self {
        Feedback {
            sender_ssrc,
            media_ssrc,
            fb_pkt_count,
            ..Default::default()
        }
    }

    fn set_base(&mut self, sequence_number: u16, time_us: i64) {
        self.base_sequence_number = sequence_number;
        self.next_sequence_number = sequence_number;
        self.ref_timestamp64ms = time_us / REFERENCE_TIME_SCALE_FACTOR;
        self.last_timestamp_us = self.ref_timestamp64ms * REFERENCE_TIME_SCALE_FACTOR;
    }

    /// Returns false, leaving the feedback untouched, when the delta to the
    /// previous packet does not fit in a large delta.
    fn add_received(&mut self, sequence_number: u16, timestamp_us: i64) -> bool {
        let delta_us = timestamp_us - self.last_timestamp_us;
        if !DeltaWidth::Large.can_encode(delta_us) {
            return false;
        }

        while self.next_sequence_number != sequence_number {
            self.push_symbol(PacketStatusSymbol::NotReceived);
        }

        let width = if DeltaWidth::Small.can_encode(delta_us) {
            DeltaWidth::Small
        } else {
            DeltaWidth::Large
        };
        self.push_symbol(width.symbol());
        self.deltas.push(RecvDelta {
            width,
            delta: delta_us,
        });
        self.last_timestamp_us = timestamp_us;

        true
    }

    fn push_symbol(&mut self, symbol: PacketStatusSymbol) {
        if !self.last_chunk.can_add(symbol) {
            self.chunks.push(self.last_chunk.encode());
        }
        self.last_chunk.add(symbol);
        self.sequence_number_count = self.sequence_number_count.wrapping_add(1);
        self.next_sequence_number = self.next_sequence_number.wrapping_add(1);
    }

    fn into_packet(mut self) -> TransportLayerCc {
        while !self.last_chunk.symbols.is_empty() {
            self.chunks.push(self.last_chunk.encode());
        }

        TransportLayerCc {
            sender_ssrc: self.sender_ssrc,
            media_ssrc: self.media_ssrc,
            base_sequence_number: self.base_sequence_number,
            packet_status_count: self.sequence_number_count,
            reference_time: self.ref_timestamp64ms as u32 & REFERENCE_TIME_MASK,
            fb_pkt_count: self.fb_pkt_count,
            packet_chunks: self.chunks,
            recv_deltas: self.deltas,
        }
    }
}

/// Statuses waiting to be packed into the tightest chunk that holds them.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
struct Chunk {
    has_large_delta: bool,
    has_different_types: bool,
    symbols: Vec<PacketStatusSymbol>,
}

impl Chunk {
    fn can_add(&self, symbol: PacketStatusSymbol) -> bool {
        if self.symbols.len() < MAX_TWO_BIT_CAP {
            return true;
        }
        if self.symbols.len() < MAX_ONE_BIT_CAP
            && !self.has_large_delta
            && symbol != PacketStatusSymbol::ReceivedLargeDelta
        {
            return true;
        }
        self.symbols.len() < MAX_RUN_LENGTH_CAP
            && !self.has_different_types
            && symbol == self.symbols[0]
    }

    fn add(&mut self, symbol: PacketStatusSymbol) {
        self.symbols.push(symbol);
        self.has_large_delta =
            self.has_large_delta || symbol == PacketStatusSymbol::ReceivedLargeDelta;
        self.has_different_types = self.has_different_types || symbol != self.symbols[0];
    }

    /// Emits one chunk from the front of the pending statuses. Only a two bit
    /// vector can leave statuses behind.
    fn encode(&mut self) -> PacketStatusChunk {
        if !self.has_different_types {
            let chunk = PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                packet_status_symbol: self.symbols[0],
                run_length: self.symbols.len() as u16,
            });
            self.reset();
            return chunk;
        }

        if self.symbols.len() == MAX_ONE_BIT_CAP {
            let chunk = PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
                symbol_size: SymbolSize::OneBit,
                symbol_list: std::mem::take(&mut self.symbols),
            });
            self.reset();
            return chunk;
        }

        let n = MAX_TWO_BIT_CAP.min(self.symbols.len());
        let mut symbol_list: Vec<PacketStatusSymbol> = self.symbols.drain(..n).collect();
        // trailing statuses past the packet status count are ignored by receivers
        symbol_list.resize(MAX_TWO_BIT_CAP, PacketStatusSymbol::NotReceived);

        self.has_large_delta = self.symbols.contains(&PacketStatusSymbol::ReceivedLargeDelta);
        self.has_different_types = self.symbols.iter().any(|s| *s != self.symbols[0]);

        PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
            symbol_size: SymbolSize::TwoBit,
            symbol_list,
        })
    }

    fn reset(&mut self) {
        self.symbols.clear();
        self.has_large_delta = false;
        self.has_different_types = false;
    }
}
