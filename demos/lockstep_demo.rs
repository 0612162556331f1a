//! Two-Peer Lockstep Demo
//!
//! Simulates both sides of a two-player match in one process: each peer
//! runs its own world and rollback system, local input is applied
//! immediately, and the remote peer's input arrives over a jittery
//! "network" that delays and reorders packets. At the end, both peers must
//! agree bit for bit.
//!
//! ```bash
//! RUST_LOG=fixedstep=debug cargo run --example lockstep_demo
//! ```

use fixedstep::{
    Collider, Fix64, FixedClock, FixedRng, MoveOp, PhysicsWorld, RigidBody, RollbackSystem,
    StateChecksum, Vec3Fix,
};
use tracing_subscriber::EnvFilter;

const TICKS: i64 = 120;
const TICK_RATE: i64 = 15;

struct Peer {
    world: PhysicsWorld,
    rollback: RollbackSystem<MoveOp>,
}

impl Peer {
    fn new() -> Self {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;
        for spawn_x in [-2i64, 2] {
            let body = world.add_body(RigidBody::at(Vec3Fix::from_int(spawn_x, 0, 0)));
            world.add_collider(Collider::sphere(Fix64::HALF).with_body(body));
        }
        Self {
            world,
            rollback: RollbackSystem::new(),
        }
    }
}

fn apply_move(world: &mut PhysicsWorld, op: &MoveOp) {
    let speed = Fix64::from_int(5);
    let dir = Vec3Fix::new(
        Fix64::from_f32(op.raw_x.clamp(-1.0, 1.0)),
        Fix64::ZERO,
        Fix64::from_f32(op.raw_z.clamp(-1.0, 1.0)),
    );
    let dir = if dir.sqr_magnitude() > Fix64::ONE {
        dir.normalized()
    } else {
        dir
    };
    world.bodies[op.player_index as usize].velocity = dir * speed;
}

/// Scripted joystick for a player at a tick.
fn stick(tick: i64, player: i32) -> MoveOp {
    let phase = (tick % 10) as f32 / 10.0;
    let flip = if player == 0 { 1.0 } else { -1.0 };
    MoveOp {
        tick: tick as i32,
        player_index: player,
        raw_x: flip * phase,
        raw_z: flip * (1.0 - phase),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dt = Fix64::from_ratio(1, TICK_RATE);
    let mut clock = FixedClock::new();
    let mut jitter = FixedRng::new(0xC0FFEE);

    let mut peer_a = Peer::new();
    let mut peer_b = Peer::new();

    // Remote packets in flight: (deliver_at_tick, destination, op).
    let mut in_flight: Vec<(i64, usize, MoveOp)> = Vec::new();

    for tick in 0..TICKS {
        // Local capture: each peer submits its own input immediately and
        // "sends" it with 0-5 ticks of jitter.
        for (player, destination) in [(0, 1usize), (1, 0usize)] {
            let op = stick(tick, player);
            let local = if player == 0 { &mut peer_a } else { &mut peer_b };
            local.rollback.submit_input(tick, op);

            let delay = (jitter.next_u32() % 6) as i64;
            in_flight.push((tick + delay, destination, op));
        }

        // Deliver everything whose time has come, in arbitrary order.
        let mut delivered = Vec::new();
        in_flight.retain(|&(deliver_at, destination, op)| {
            if deliver_at <= tick {
                delivered.push((destination, op));
                false
            } else {
                true
            }
        });
        for (destination, op) in delivered {
            let peer = if destination == 0 { &mut peer_a } else { &mut peer_b };
            peer.rollback.submit_input(op.tick as i64, op);
        }

        peer_a
            .rollback
            .advance_to(&mut peer_a.world, tick, dt, apply_move);
        peer_b
            .rollback
            .advance_to(&mut peer_b.world, tick, dt, apply_move);
        clock.tick(dt);
    }

    // Flush the last stragglers and let both peers catch up.
    for (_, destination, op) in in_flight.drain(..) {
        let peer = if destination == 0 { &mut peer_a } else { &mut peer_b };
        peer.rollback.submit_input(op.tick as i64, op);
    }
    peer_a
        .rollback
        .advance_to(&mut peer_a.world, TICKS - 1, dt, apply_move);
    peer_b
        .rollback
        .advance_to(&mut peer_b.world, TICKS - 1, dt, apply_move);

    let checksum_a = StateChecksum::from_bodies(&peer_a.world.bodies);
    let checksum_b = StateChecksum::from_bodies(&peer_b.world.bodies);

    println!(
        "simulated {} ticks ({}s of game time)",
        clock.frame_count(),
        clock.elapsed()
    );
    for (name, peer) in [("peer A", &peer_a), ("peer B", &peer_b)] {
        for (i, body) in peer.world.bodies.iter().enumerate() {
            println!(
                "  {name} player {i}: ({:.4}, {:.4})",
                body.position.x.to_f64(),
                body.position.z.to_f64()
            );
        }
    }
    println!("checksum A: {:#018x}", checksum_a.0);
    println!("checksum B: {:#018x}", checksum_b.0);

    assert_eq!(checksum_a, checksum_b, "peers desynced");
    println!("peers agree bit-for-bit");
}
