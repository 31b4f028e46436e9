/// Benchmarks for routing inbound frames, the hot path of every live session.
///
/// Match and performance updates arrive every few seconds per watched match,
/// so their decode cost dominates.
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use herald_realtime::realtime::router::route;
use herald_realtime::realtime::types::request::OutboundFrame;

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("router/route");

    let frames = [
        (
            "match_update",
            r#"{
                "type": "match_update",
                "match_id": "EUW1_6543210",
                "data": {
                    "game_id": "EUW1_6543210",
                    "status": "in_progress",
                    "game_time": 1284,
                    "participants": [
                        {"summoner_name": "Caps", "champion_name": "Sylas", "level": 14,
                         "kills": 6, "deaths": 2, "assists": 7, "cs": 201, "gold": 11240,
                         "items": [3157, 3020, 3165], "kda": 6.5},
                        {"summoner_name": "Jankos", "champion_name": "Lee Sin", "level": 13,
                         "kills": 3, "deaths": 3, "assists": 11, "cs": 142, "gold": 9310,
                         "items": [6692, 3047], "kda": 4.67}
                    ],
                    "team_stats": {
                        "blue_team": {"kills": 17, "deaths": 9, "assists": 31, "gold": 48200,
                                      "dragons": 2, "barons": 1, "towers": 6, "inhibitors": 1},
                        "red_team": {"kills": 9, "deaths": 17, "assists": 14, "gold": 41050,
                                     "dragons": 1, "barons": 0, "towers": 2, "inhibitors": 0}
                    }
                },
                "timestamp": "2024-05-01T10:30:00Z",
                "id": "evt-1"
            }"#,
        ),
        (
            "performance_update",
            r#"{
                "type": "performance_update",
                "data": {
                    "user_id": "player-1", "current_kda": 3.2, "average_kda": 2.8,
                    "cs_per_minute": 7.4, "vision_score": 31.0, "damage_share": 0.27,
                    "gold_efficiency": 1.08,
                    "improvement_suggestion": "Ward the enemy jungle before dragon spawns"
                },
                "timestamp": 1714559400000,
                "id": "evt-2"
            }"#,
        ),
        (
            "rank_update",
            r#"{
                "type": "rank_update",
                "data": {"old_rank": "GOLD II", "new_rank": "GOLD I", "queue": "RANKED_SOLO_5x5",
                         "lp": 12, "lp_change": 22},
                "timestamp": "2024-05-01T10:30:00Z",
                "id": "evt-3"
            }"#,
        ),
        (
            "unknown",
            r#"{"type": "room_joined", "data": {"room_id": "r1"}, "timestamp": 1714559400000}"#,
        ),
        ("malformed", r#"{"type": "match_update", "data": "#),
    ];

    for (name, frame) in frames {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            b.iter(|| route(std::hint::black_box(frame)));
        });
    }

    group.finish();
}

fn bench_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("router/outbound");

    group.bench_function("watch_match", |b| {
        b.iter(|| OutboundFrame::watch_match(std::hint::black_box("EUW1_6543210")).to_json());
    });
    group.bench_function("pong", |b| {
        b.iter(|| OutboundFrame::pong(std::hint::black_box(1_714_559_400_000)).to_json());
    });

    group.finish();
}

criterion_group!(router_benches, bench_route, bench_outbound);
criterion_main!(router_benches);
