use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion};
use twcc::recorder::Recorder;
use twcc::transport_layer_cc::{
    DeltaWidth, PacketStatusChunk, PacketStatusSymbol, RecvDelta, RunLengthChunk,
    StatusVectorChunk, SymbolSize, TransportLayerCc,
};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

fn benchmark_transport_layer_cc(c: &mut Criterion) {
    let tcc = TransportLayerCc {
        sender_ssrc: 0x4bc4fcb4,
        media_ssrc: 0x12345678,
        base_sequence_number: 0x8a3c,
        packet_status_count: 7 + 14 + 40,
        reference_time: 0x123456,
        fb_pkt_count: 23,
        packet_chunks: vec![
            PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
                symbol_size: SymbolSize::TwoBit,
                symbol_list: vec![
                    PacketStatusSymbol::ReceivedSmallDelta,
                    PacketStatusSymbol::ReceivedLargeDelta,
                    PacketStatusSymbol::NotReceived,
                    PacketStatusSymbol::ReceivedSmallDelta,
                    PacketStatusSymbol::ReceivedSmallDelta,
                    PacketStatusSymbol::NotReceived,
                    PacketStatusSymbol::ReceivedLargeDelta,
                ],
            }),
            PacketStatusChunk::StatusVectorChunk(StatusVectorChunk {
                symbol_size: SymbolSize::OneBit,
                symbol_list: vec![PacketStatusSymbol::ReceivedSmallDelta; 14],
            }),
            PacketStatusChunk::RunLengthChunk(RunLengthChunk {
                packet_status_symbol: PacketStatusSymbol::ReceivedSmallDelta,
                run_length: 40,
            }),
        ],
        recv_deltas: [
            DeltaWidth::Small,
            DeltaWidth::Large,
            DeltaWidth::Small,
            DeltaWidth::Small,
            DeltaWidth::Large,
        ]
        .into_iter()
        .chain(std::iter::repeat(DeltaWidth::Small).take(14 + 40))
        .enumerate()
        .map(|(i, width)| RecvDelta {
            width,
            delta: (i as i64 % 200) * 250,
        })
        .collect(),
    };

    let raw = tcc.marshal().unwrap();
    let buf = &mut raw.clone();
    let p = TransportLayerCc::unmarshal(buf).unwrap();
    if tcc != p {
        panic!("marshal or unmarshal not correct: \ntcc: {tcc:?} \nvs \np: {p:?}");
    }

    let mut buf = BytesMut::with_capacity(tcc.marshal_size());
    buf.resize(tcc.marshal_size(), 0);
    c.bench_function("TransportLayerCc MarshalTo", |b| {
        b.iter(|| {
            let _ = tcc.marshal_to(&mut buf).unwrap();
        })
    });

    c.bench_function("TransportLayerCc Marshal", |b| {
        b.iter(|| {
            let _ = tcc.marshal().unwrap();
        })
    });

    c.bench_function("TransportLayerCc Unmarshal", |b| {
        b.iter(|| {
            let buf = &mut raw.clone();
            let _ = TransportLayerCc::unmarshal(buf).unwrap();
        })
    });
}

fn benchmark_recorder(c: &mut Criterion) {
    c.bench_function("Recorder BuildFeedbackPacket", |b| {
        b.iter(|| {
            let mut r = Recorder::new(0x4bc4fcb4);
            let mut arrival_time = 64000i64;
            for sequence_number in 0..200u16 {
                // every 10th packet lost, every 50th late
                if sequence_number % 10 == 9 {
                    continue;
                }
                arrival_time += if sequence_number % 50 == 0 { 80_000 } else { 1_000 };
                r.record(0x12345678, sequence_number, arrival_time);
            }
            let _ = r.build_feedback_packet();
        })
    });
}

criterion_group!(benches, benchmark_transport_layer_cc, benchmark_recorder);
criterion_main!(benches);
