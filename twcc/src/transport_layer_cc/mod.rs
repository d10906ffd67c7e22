
use std::any::Any;
use std::fmt;

use bytes::{Buf, BufMut};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::Error;
use crate::header::*;
use crate::packet::Packet;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

/// Offset of the first packet status chunk after the header
const PACKET_CHUNK_OFFSET: usize = 16;

/// len of packet status chunk
const PACKET_STATUS_CHUNK_LENGTH: usize = 2;

/// Largest value of the 13-bit run length field.
pub const MAX_RUN_LENGTH: u16 = 0x1fff;

/// https://tools.ietf.org/html/draft-holmer-rmcat-transport-wide-cc-extensions-01#section-3.1.5
pub const TYPE_TCC_DELTA_SCALE_FACTOR: i64 = 250;

/// Leading bit of a packet status chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
enum StatusChunkType {
    RunLength = 0,
    StatusVector = 1,
}

impl From<u16> for StatusChunkType {
    fn from(val: u16) -> Self {
        match val & 0x1 {
            0 => StatusChunkType::RunLength,
            _ => StatusChunkType::StatusVector,
        }
    }
}

/// Receive status of one transport-wide sequenced packet.
///
/// ## Specifications
///
/// * [draft-holmer-rmcat-transport-wide-cc-extensions-01, section 3.1.1]
///
/// [draft-holmer-rmcat-transport-wide-cc-extensions-01, section 3.1.1]: https://tools.ietf.org/html/draft-holmer-rmcat-transport-wide-cc-extensions-01#section-3.1.1
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
#[repr(u16)]
pub enum PacketStatusSymbol {
    #[default]
    NotReceived = 0,
    ReceivedSmallDelta = 1,
    ReceivedLargeDelta = 2,
    /// See Example 2 on page 7: "packet received, w/o recv delta"
    ReceivedWithoutDelta = 3,
}

impl PacketStatusSymbol {
    /// Width of the receive delta that follows a packet with this status, if any.
    pub fn delta_width(self) -> Option<DeltaWidth> {
        match self {
            PacketStatusSymbol::ReceivedSmallDelta => Some(DeltaWidth::Small),
            PacketStatusSymbol::ReceivedLargeDelta => Some(DeltaWidth::Large),
            _ => None,
        }
    }
}

impl From<u16> for PacketStatusSymbol {
    fn from(val: u16) -> Self {
        match val & 0x3 {
            0 => PacketStatusSymbol::NotReceived,
            1 => PacketStatusSymbol::ReceivedSmallDelta,
            2 => PacketStatusSymbol::ReceivedLargeDelta,
            _ => PacketStatusSymbol::ReceivedWithoutDelta,
        }
    }
}

/// Symbol size of a status vector chunk.
///
/// The draft swaps the meaning of the one bit symbols; on the wire 0 is
/// "not received" and 1 is "received, small delta".
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
#[repr(u16)]
pub enum SymbolSize {
    #[default]
    OneBit = 0,
    TwoBit = 1,
}

impl SymbolSize {
    pub fn bits(self) -> u32 {
        match self {
            SymbolSize::OneBit => 1,
            SymbolSize::TwoBit => 2,
        }
    }

    /// Number of symbols one chunk carries.
    pub fn capacity(self) -> usize {
        match self {
            SymbolSize::OneBit => 14,
            SymbolSize::TwoBit => 7,
        }
    }

    fn can_encode(self, symbol: PacketStatusSymbol) -> bool {
        match self {
            SymbolSize::OneBit => matches!(
                symbol,
                PacketStatusSymbol::NotReceived | PacketStatusSymbol::ReceivedSmallDelta
            ),
            SymbolSize::TwoBit => true,
        }
    }
}

impl From<u16> for SymbolSize {
    fn from(val: u16) -> Self {
        match val & 0x1 {
            0 => SymbolSize::OneBit,
            _ => SymbolSize::TwoBit,
        }
    }
}

/// PacketStatusChunk has two kinds:
/// RunLengthChunk and StatusVectorChunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketStatusChunk {
    RunLengthChunk(RunLengthChunk),
    StatusVectorChunk(StatusVectorChunk),
}

impl PacketStatusChunk {
    /// Number of packets this chunk reports on.
    pub fn packet_count(&self) -> usize {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => c.run_length as usize,
            PacketStatusChunk::StatusVectorChunk(c) => c.symbol_list.len(),
        }
    }

    /// The status of every packet this chunk covers, in sequence order.
    pub fn symbols(&self) -> impl Iterator<Item = PacketStatusSymbol> + '_ {
        (0..self.packet_count()).map(move |i| match self {
            PacketStatusChunk::RunLengthChunk(c) => c.packet_status_symbol,
            PacketStatusChunk::StatusVectorChunk(c) => c.symbol_list[i],
        })
    }
}

impl MarshalSize for PacketStatusChunk {
    fn marshal_size(&self) -> usize {
        PACKET_STATUS_CHUNK_LENGTH
    }
}

impl Marshal for PacketStatusChunk {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            PacketStatusChunk::RunLengthChunk(c) => c.marshal_to(buf),
            PacketStatusChunk::StatusVectorChunk(c) => c.marshal_to(buf),
        }
    }
}

impl Unmarshal for PacketStatusChunk {
    /// Dispatches on the leading bit of the chunk.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < PACKET_STATUS_CHUNK_LENGTH {
            return Err(Error::PacketStatusChunkLength.into());
        }

        let mut chunk_reader = raw_packet.copy_to_bytes(PACKET_STATUS_CHUNK_LENGTH);
        let typ = get_nbits_from_byte(chunk_reader[0], 0, 1);

        Ok(match StatusChunkType::from(typ) {
            StatusChunkType::RunLength => {
                PacketStatusChunk::RunLengthChunk(RunLengthChunk::unmarshal(&mut chunk_reader)?)
            }
            StatusChunkType::StatusVector => PacketStatusChunk::StatusVectorChunk(
                StatusVectorChunk::unmarshal(&mut chunk_reader)?,
            ),
        })
    }
}

/// RunLengthChunk T=0
/// 0                   1
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |T| S |       Run Length        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunLengthChunk {
    /// S: status shared by every packet of the run
    pub packet_status_symbol: PacketStatusSymbol,
    /// run_length: count of S, at most MAX_RUN_LENGTH
    pub run_length: u16,
}

impl MarshalSize for RunLengthChunk {
    fn marshal_size(&self) -> usize {
        PACKET_STATUS_CHUNK_LENGTH
    }
}

impl Marshal for RunLengthChunk {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.run_length > MAX_RUN_LENGTH {
            return Err(Error::RunLengthExceedLimit.into());
        }
        if buf.remaining_mut() < PACKET_STATUS_CHUNK_LENGTH {
            return Err(Error::BufferTooShort.into());
        }

        let mut w = BitWriter::new_u16();
        w.append(1, StatusChunkType::RunLength as u32)?;
        w.append(2, self.packet_status_symbol as u32)?;
        w.append(13, self.run_length as u32)?;

        buf.put_u16(w.finish_u16());

        Ok(PACKET_STATUS_CHUNK_LENGTH)
    }
}

impl Unmarshal for RunLengthChunk {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() != PACKET_STATUS_CHUNK_LENGTH {
            return Err(Error::PacketStatusChunkLength.into());
        }

        let b0 = raw_packet.get_u8();
        let b1 = raw_packet.get_u8();

        if StatusChunkType::from(get_nbits_from_byte(b0, 0, 1)) != StatusChunkType::RunLength {
            return Err(Error::WrongChunkType.into());
        }

        let packet_status_symbol = get_nbits_from_byte(b0, 1, 2).into();
        let run_length = (get_nbits_from_byte(b0, 3, 5) << 8) | b1 as u16;

        Ok(RunLengthChunk {
            packet_status_symbol,
            run_length,
        })
    }
}

/// StatusVectorChunk T=1
/// 0                   1
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |T|S|       symbol list         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusVectorChunk {
    pub symbol_size: SymbolSize,
    /// 14 one-bit symbols (NotReceived or ReceivedSmallDelta) or 7 two-bit
    /// symbols. Marshal zero-fills a shorter list, unmarshal always yields a
    /// full one.
    pub symbol_list: Vec<PacketStatusSymbol>,
}

impl MarshalSize for StatusVectorChunk {
    fn marshal_size(&self) -> usize {
        PACKET_STATUS_CHUNK_LENGTH
    }
}

impl Marshal for StatusVectorChunk {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < PACKET_STATUS_CHUNK_LENGTH {
            return Err(Error::BufferTooShort.into());
        }

        let mut w = BitWriter::new_u16();
        w.append(1, StatusChunkType::StatusVector as u32)?;
        w.append(1, self.symbol_size as u32)?;

        let num_of_bits = self.symbol_size.bits();
        for s in &self.symbol_list {
            if !self.symbol_size.can_encode(*s) {
                return Err(Error::SymbolOutOfRange.into());
            }
            w.append(num_of_bits, *s as u32)?;
        }

        buf.put_u16(w.finish_u16());

        Ok(PACKET_STATUS_CHUNK_LENGTH)
    }
}

impl Unmarshal for StatusVectorChunk {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() != PACKET_STATUS_CHUNK_LENGTH {
            return Err(Error::PacketStatusChunkLength.into());
        }

        let b0 = raw_packet.get_u8();
        let b1 = raw_packet.get_u8();

        if StatusChunkType::from(get_nbits_from_byte(b0, 0, 1)) != StatusChunkType::StatusVector {
            return Err(Error::WrongChunkType.into());
        }

        let symbol_size: SymbolSize = get_nbits_from_byte(b0, 1, 1).into();

        let mut symbol_list = Vec::with_capacity(symbol_size.capacity());
        match symbol_size {
            SymbolSize::OneBit => {
                for i in 0..6u16 {
                    symbol_list.push(get_nbits_from_byte(b0, 2 + i, 1).into());
                }
                for i in 0..8u16 {
                    symbol_list.push(get_nbits_from_byte(b1, i, 1).into());
                }
            }
            SymbolSize::TwoBit => {
                for i in 0..3u16 {
                    symbol_list.push(get_nbits_from_byte(b0, 2 + i * 2, 2).into());
                }
                for i in 0..4u16 {
                    symbol_list.push(get_nbits_from_byte(b1, i * 2, 2).into());
                }
            }
        }

        Ok(StatusVectorChunk {
            symbol_size,
            symbol_list,
        })
    }
}

/// Width of a receive delta on the wire.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub enum DeltaWidth {
    /// 1 byte, unsigned: [0, 63.75]ms
    #[default]
    Small,
    /// 2 bytes, signed: [-8192.0, 8191.75]ms
    Large,
}

impl DeltaWidth {
    pub fn size(self) -> usize {
        match self {
            DeltaWidth::Small => 1,
            DeltaWidth::Large => 2,
        }
    }

    /// The status symbol announcing a delta of this width.
    pub fn symbol(self) -> PacketStatusSymbol {
        match self {
            DeltaWidth::Small => PacketStatusSymbol::ReceivedSmallDelta,
            DeltaWidth::Large => PacketStatusSymbol::ReceivedLargeDelta,
        }
    }

    /// Reports whether `delta_us` lies within the range this width can carry.
    pub fn can_encode(self, delta_us: i64) -> bool {
        let (min, max) = match self {
            DeltaWidth::Small => (0, u8::MAX as i64),
            DeltaWidth::Large => (i16::MIN as i64, i16::MAX as i64),
        };
        (min * TYPE_TCC_DELTA_SCALE_FACTOR..=max * TYPE_TCC_DELTA_SCALE_FACTOR).contains(&delta_us)
    }
}

/// RecvDelta are represented as multiples of 250us
/// small delta is 1 byte: [0, 63.75]ms = [0, 63750]us = [0, 255]*250us
/// big delta is 2 bytes: [-8192.0, 8191.75]ms = [-8192000, 8191750]us = [-32768, 32767]*250us
/// https://tools.ietf.org/html/draft-holmer-rmcat-transport-wide-cc-extensions-01#section-3.1.5
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecvDelta {
    pub width: DeltaWidth,
    /// us
    pub delta: i64,
}

impl MarshalSize for RecvDelta {
    fn marshal_size(&self) -> usize {
        self.width.size()
    }
}

impl Marshal for RecvDelta {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if !self.width.can_encode(self.delta) {
            return Err(Error::DeltaExceedLimit.into());
        }
        let delta = self.delta / TYPE_TCC_DELTA_SCALE_FACTOR;

        if buf.remaining_mut() < self.width.size() {
            return Err(Error::BufferTooShort.into());
        }

        match self.width {
            DeltaWidth::Small => buf.put_u8(delta as u8),
            DeltaWidth::Large => buf.put_i16(delta as i16),
        }

        Ok(self.width.size())
    }
}

impl Unmarshal for RecvDelta {
    /// The width is taken from the buffer length, which must be 1 or 2.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        match raw_packet.remaining() {
            1 => Ok(RecvDelta {
                width: DeltaWidth::Small,
                delta: TYPE_TCC_DELTA_SCALE_FACTOR * raw_packet.get_u8() as i64,
            }),
            2 => Ok(RecvDelta {
                width: DeltaWidth::Large,
                delta: TYPE_TCC_DELTA_SCALE_FACTOR * raw_packet.get_i16() as i64,
            }),
            _ => Err(Error::DeltaExceedLimit.into()),
        }
    }
}

/// Status of one packet of a feedback report, see [`TransportLayerCc::packet_results`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketResult {
    pub sequence_number: u16,
    pub symbol: PacketStatusSymbol,
    /// Receive delta in us, for packets reported with one.
    pub delta: Option<i64>,
}

/// TransportLayerCC for sender-BWE
/// https://tools.ietf.org/html/draft-holmer-rmcat-transport-wide-cc-extensions-01#page-5
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|  FMT=15 |    PT=205     |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     SSRC of packet sender                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      SSRC of media source                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      base sequence number     |      packet status count      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 reference time                | fb pkt. count |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          packet chunk         |         packet chunk          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// .                                                               .
/// .                                                               .
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         packet chunk          |  recv delta   |  recv delta   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// .                                                               .
/// .                                                               .
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           recv delta          |  recv delta   | zero padding  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct TransportLayerCc {
    /// SSRC of sender
    pub sender_ssrc: u32,
    /// SSRC of the media source
    pub media_ssrc: u32,
    /// Transport wide sequence number of the first packet reported
    pub base_sequence_number: u16,
    /// Number of packets the chunks report on
    pub packet_status_count: u16,
    /// 24 bits, in multiples of 64ms
    pub reference_time: u32,
    /// Incremented for every feedback packet sent
    pub fb_pkt_count: u8,
    pub packet_chunks: Vec<PacketStatusChunk>,
    /// One entry per packet reported with a small or large delta, in chunk order
    pub recv_deltas: Vec<RecvDelta>,
}

impl fmt::Display for TransportLayerCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TransportLayerCC:")?;
        writeln!(f, "\tSender Ssrc {}", self.sender_ssrc)?;
        writeln!(f, "\tMedia Ssrc {}", self.media_ssrc)?;
        writeln!(f, "\tBase Sequence Number {}", self.base_sequence_number)?;
        writeln!(f, "\tStatus Count {}", self.packet_status_count)?;
        writeln!(f, "\tReference Time {}", self.reference_time)?;
        writeln!(f, "\tFeedback Packet Count {}", self.fb_pkt_count)?;
        write!(f, "\tPacketChunks ")?;
        for chunk in &self.packet_chunks {
            write!(f, "{chunk:?} ")?;
        }
        write!(f, "\n\tRecvDeltas ")?;
        for delta in &self.recv_deltas {
            write!(f, "{delta:?} ")?;
        }
        writeln!(f)
    }
}

impl TransportLayerCc {
    /// Expands the chunks and deltas into one entry per reported packet,
    /// starting at base_sequence_number.
    pub fn packet_results(&self) -> std::result::Result<Vec<PacketResult>, Error> {
        let mut results = Vec::with_capacity(self.packet_status_count as usize);
        let mut deltas = self.recv_deltas.iter();
        let mut sequence_number = self.base_sequence_number;

        let symbols = self
            .packet_chunks
            .iter()
            .flat_map(|c| c.symbols())
            .take(self.packet_status_count as usize);

        for symbol in symbols {
            let delta = match symbol.delta_width() {
                Some(_) => Some(deltas.next().ok_or(Error::PacketTooShort)?.delta),
                None => None,
            };
            results.push(PacketResult {
                sequence_number,
                symbol,
                delta,
            });
            sequence_number = sequence_number.wrapping_add(1);
        }

        if results.len() < self.packet_status_count as usize {
            return Err(Error::PacketTooShort);
        }

        Ok(results)
    }
}

impl Packet for TransportLayerCc {
    fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_TCC,
            packet_type: PacketType::TransportSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.media_ssrc]
    }

    fn raw_size(&self) -> usize {
        HEADER_LENGTH
            + PACKET_CHUNK_OFFSET
            + self.packet_chunks.len() * PACKET_STATUS_CHUNK_LENGTH
            + self
                .recv_deltas
                .iter()
                .map(|d| d.marshal_size())
                .sum::<usize>()
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn equal(&self, other: &(dyn Packet + Send + Sync)) -> bool {
        other
            .as_any()
            .downcast_ref::<TransportLayerCc>()
            .map_or(false, |a| self == a)
    }

    fn cloned(&self) -> Box<dyn Packet + Send + Sync> {
        Box::new(self.clone())
    }
}

impl MarshalSize for TransportLayerCc {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for TransportLayerCc {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::BufferTooShort.into());
        }
        // the header counts 32-bit words minus one in 16 bits
        if self.marshal_size() / 4 - 1 > u16::MAX as usize {
            return Err(Error::InvalidHeader.into());
        }

        let h = self.header();
        let n = h.marshal_to(buf)?;
        buf = &mut buf[n..];

        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_u16(self.base_sequence_number);
        buf.put_u16(self.packet_status_count);

        let mut w = BitWriter::new_u32();
        w.append(24, self.reference_time)?;
        w.append(8, self.fb_pkt_count as u32)?;
        buf.put_u32(w.finish());

        for chunk in &self.packet_chunks {
            let n = chunk.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        for delta in &self.recv_deltas {
            let n = delta.marshal_to(buf)?;
            buf = &mut buf[n..];
        }

        put_zero_padding(buf, self.raw_size());

        log::trace!(
            "marshaled twcc media_ssrc={} base_seq={} status_count={} chunks={} deltas={}",
            self.media_ssrc,
            self.base_sequence_number,
            self.packet_status_count,
            self.packet_chunks.len(),
            self.recv_deltas.len()
        );

        Ok(self.marshal_size())
    }
}

impl Unmarshal for TransportLayerCc {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < (HEADER_LENGTH + SSRC_LENGTH) {
            return Err(Error::PacketTooShort.into());
        }

        let h = Header::unmarshal(raw_packet)?;

        // https://tools.ietf.org/html/rfc4585#page-33
        // header's length + payload's length
        let total_length = 4 * (h.length as usize + 1);

        // A report with no chunks at all (packet_status_count 0) is accepted,
        // so an empty report read back equals the one that was written.
        if total_length < HEADER_LENGTH + PACKET_CHUNK_OFFSET {
            return Err(Error::PacketTooShort.into());
        }

        if raw_packet_len < total_length {
            return Err(Error::PacketTooShort.into());
        }

        if h.packet_type != PacketType::TransportSpecificFeedback || h.count != FORMAT_TCC {
            return Err(Error::WrongType.into());
        }

        let sender_ssrc = raw_packet.get_u32();
        let media_ssrc = raw_packet.get_u32();
        let base_sequence_number = raw_packet.get_u16();
        let packet_status_count = raw_packet.get_u16();

        let mut reference_time = [0u8; 3];
        raw_packet.copy_to_slice(&mut reference_time);
        let reference_time = get_24bits_from_bytes(&reference_time);
        let fb_pkt_count = raw_packet.get_u8();

        let mut packet_chunks = vec![];
        let mut recv_deltas = vec![];

        let mut packet_status_pos = HEADER_LENGTH + PACKET_CHUNK_OFFSET;
        let mut processed_packet_num = 0usize;
        while processed_packet_num < packet_status_count as usize {
            if packet_status_pos + PACKET_STATUS_CHUNK_LENGTH > total_length {
                return Err(Error::PacketTooShort.into());
            }

            let chunk = PacketStatusChunk::unmarshal(raw_packet)?;
            packet_status_pos += PACKET_STATUS_CHUNK_LENGTH;

            let remaining = packet_status_count as usize - processed_packet_num;
            // every slot is its own value, filled in by the second pass
            for width in chunk.symbols().take(remaining).filter_map(|s| s.delta_width()) {
                recv_deltas.push(RecvDelta { width, delta: 0 });
            }

            processed_packet_num += chunk.packet_count().min(remaining);
            packet_chunks.push(chunk);
        }

        let mut recv_deltas_pos = packet_status_pos;
        for delta in &mut recv_deltas {
            let size = delta.width.size();
            if recv_deltas_pos + size > total_length {
                return Err(Error::PacketTooShort.into());
            }

            let mut delta_reader = raw_packet.take(size);
            *delta = RecvDelta::unmarshal(&mut delta_reader)?;
            recv_deltas_pos += size;
        }

        // padding up to the declared length
        raw_packet.advance(total_length - recv_deltas_pos);

        log::trace!(
            "unmarshaled twcc media_ssrc={} base_seq={} status_count={} chunks={} deltas={}",
            media_ssrc,
            base_sequence_number,
            packet_status_count,
            packet_chunks.len(),
            recv_deltas.len()
        );

        Ok(TransportLayerCc {
            sender_ssrc,
            media_ssrc,
            base_sequence_number,
            packet_status_count,
            reference_time,
            fb_pkt_count,
            packet_chunks,
            recv_deltas,
        })
    }
}
