//! Host entry points driven through a registry, the way a host calls them.

use std::sync::Arc;

use bytes::Bytes;
use claims_core::{BlockPos, ChunkPos, DimensionId, Direction, Owner, Permission, PlayerId};
use claims_protection::{EffectSource, EffectTarget, ItemUse, PistonMove};
use claims_server::{
    ClientboundHandshake, DiagnosticSink, PacketSink, PermissionTarget, ServerConfig, ServerCore,
    ServerData, ServerHandle, ServerRegistry, TickError,
};
use claims_store::ClaimFlags;
use hashbrown::HashMap;
use parking_lot::Mutex;

const HANDLE: ServerHandle = ServerHandle(1);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn player(n: u128) -> PlayerId {
    PlayerId::from_u128(n)
}

fn dim() -> DimensionId {
    DimensionId::overworld()
}

/// Block in the middle of chunk `(cx, 0)`.
fn block(cx: i32) -> BlockPos {
    BlockPos::new(cx * 16 + 8, 64, 8)
}

fn registry_with(config: ServerConfig) -> (ServerRegistry, Arc<ServerData>) {
    init_tracing();
    let registry = ServerRegistry::new();
    let data = Arc::new(ServerData::new(config));
    registry.register(HANDLE, Arc::clone(&data));
    (registry, data)
}

#[derive(Default)]
struct RecordingSink {
    packets: Mutex<Vec<(PlayerId, Bytes)>>,
    faults: Mutex<Vec<TickError>>,
}

impl PacketSink for RecordingSink {
    fn send_to_player(&self, player: PlayerId, packet: Bytes) {
        self.packets.lock().push((player, packet));
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, _handle: ServerHandle, error: &TickError) {
        self.faults.lock().push(error.clone());
    }
}

#[test]
fn test_fire_spread_flips_with_grant() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), false, ClaimFlags::default())?;

    assert!(!ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(0)));
    assert!(ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(4)));

    data.toggle_permission(
        player(1),
        false,
        PermissionTarget::Environment,
        Permission::FireSpread,
        true,
    )?;
    assert!(ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(0)));
    Ok(())
}

#[test]
fn test_claims_only_fire_on_unclaimed_land() {
    let mut config = ServerConfig::default();
    config.protection.claims_only = Permission::FireSpread.into();
    let (registry, _data) = registry_with(config);

    assert!(!ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(4)));
}

#[test]
fn test_piston_denies_whole_move() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(1, 0), false, ClaimFlags::default())?;

    // Five blocks inside chunk 0, the last one pushed across into chunk 1
    let to_push: Vec<BlockPos> = (11..=15).map(|x| BlockPos::new(x, 64, 8)).collect();
    let piston = PistonMove {
        piston: BlockPos::new(10, 64, 8),
        direction: Direction::East,
        extending: true,
        to_push: &to_push,
        to_destroy: &[],
    };
    assert!(!ServerCore::can_piston_push(&registry, HANDLE, &dim(), &piston));

    let retracting = PistonMove {
        extending: false,
        to_push: &to_push[..3],
        ..piston
    };
    assert!(ServerCore::can_piston_push(&registry, HANDLE, &dim(), &retracting));
    Ok(())
}

#[test]
fn test_collide_filter_keeps_permitted_in_order() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(1, 0), false, ClaimFlags::default())?;
    data.claim(player(2), &dim(), ChunkPos::new(3, 0), false, ClaimFlags::default())?;

    let entities = vec![
        ("zombie", block(0)),
        ("cow", block(1)),
        ("pig", block(2)),
        ("sheep", block(3)),
        ("bat", block(5)),
    ];
    let kept = ServerCore::on_mod_collide_entities(
        &registry,
        HANDLE,
        &dim(),
        entities,
        |(_, pos)| *pos,
        BlockPos::new(-100, 64, -100),
    );
    let names: Vec<_> = kept.into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["zombie", "pig", "bat"]);
    Ok(())
}

#[test]
fn test_symmetry_filter_uses_player() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), false, ClaimFlags::default())?;
    data.claim(player(2), &dim(), ChunkPos::new(1, 0), false, ClaimFlags::default())?;

    let mut states = HashMap::new();
    states.insert(block(0), "stone");
    states.insert(block(1), "glass");
    states.insert(block(2), "dirt");

    let kept = ServerCore::on_mod_symmetry_processed(&registry, HANDLE, &dim(), player(1), states);
    assert_eq!(kept.len(), 2);
    assert!(kept.contains_key(&block(0)));
    assert!(kept.contains_key(&block(2)));
    Ok(())
}

#[test]
fn test_mod_break_and_cannon() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), false, ClaimFlags::default())?;
    data.claim(player(2), &dim(), ChunkPos::new(2, 0), false, ClaimFlags::default())?;

    let fetched = ServerCore::replace_block_fetch_on_mod_break(
        "ore",
        "bedrock",
        &registry,
        HANDLE,
        &dim(),
        block(2),
        block(0),
    );
    assert_eq!(fetched, "bedrock");

    let own = ServerCore::replace_block_fetch_on_mod_break(
        "ore",
        "bedrock",
        &registry,
        HANDLE,
        &dim(),
        BlockPos::new(3, 64, 3),
        block(0),
    );
    assert_eq!(own, "ore");

    assert!(!ServerCore::can_mod_cannon_place_block(
        &registry,
        HANDLE,
        &dim(),
        block(0),
        block(2)
    ));
    assert!(ServerCore::can_mod_cannon_place_block(
        &registry,
        HANDLE,
        &dim(),
        block(0),
        block(5)
    ));
    Ok(())
}

#[test]
fn test_fluid_and_dispenser_hooks() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(1, 0), false, ClaimFlags::default())?;
    let edge = BlockPos::new(15, 64, 8);
    let inside = BlockPos::new(16, 64, 8);

    assert!(!ServerCore::replace_fluid_can_pass_through(
        true,
        &registry,
        HANDLE,
        &dim(),
        edge,
        inside
    ));
    // A host-side `false` is never turned into `true`
    assert!(!ServerCore::replace_fluid_can_pass_through(
        false,
        &registry,
        HANDLE,
        &dim(),
        inside,
        BlockPos::new(17, 64, 8)
    ));

    let behavior = ServerCore::replace_dispense_behavior(
        "shoot",
        "noop",
        &registry,
        HANDLE,
        &dim(),
        edge,
        Direction::East,
    );
    assert_eq!(behavior, "noop");
    Ok(())
}

#[test]
fn test_item_use_and_entity_effect() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), false, ClaimFlags::default())?;

    let use_lever = ItemUse {
        item: "minecraft:air",
        block: "minecraft:lever",
        places_block: false,
    };
    assert!(!ServerCore::may_use_item_at(
        &registry,
        HANDLE,
        player(2),
        &dim(),
        block(0),
        Direction::Up,
        use_lever
    ));
    assert!(ServerCore::may_use_item_at(
        &registry,
        HANDLE,
        player(1),
        &dim(),
        block(0),
        Direction::Up,
        use_lever
    ));

    let target = EffectTarget {
        player: None,
        dimension: dim(),
        pos: block(0),
    };
    assert!(!ServerCore::can_add_living_entity_effect(
        &registry,
        HANDLE,
        &target,
        Some(EffectSource::PlayerOwned(player(2)))
    ));
    assert!(ServerCore::can_add_living_entity_effect(
        &registry,
        HANDLE,
        &target,
        Some(EffectSource::Mob)
    ));
    Ok(())
}

#[test]
fn test_fail_open_without_bundle() {
    init_tracing();
    let registry = ServerRegistry::new();
    let missing = ServerHandle(404);
    let to_push = [BlockPos::new(15, 64, 8)];
    let piston = PistonMove {
        piston: BlockPos::new(14, 64, 8),
        direction: Direction::East,
        extending: true,
        to_push: &to_push,
        to_destroy: &[],
    };
    let target = EffectTarget {
        player: None,
        dimension: dim(),
        pos: block(0),
    };
    let item = ItemUse {
        item: "minecraft:stone",
        block: "minecraft:dirt",
        places_block: true,
    };

    assert!(ServerCore::can_add_living_entity_effect(
        &registry,
        missing,
        &target,
        Some(EffectSource::Player(player(2)))
    ));
    assert!(ServerCore::can_spread_fire(&registry, missing, &dim(), block(0)));
    assert!(ServerCore::may_use_item_at(
        &registry,
        missing,
        player(2),
        &dim(),
        block(0),
        Direction::Up,
        item
    ));
    assert!(ServerCore::replace_fluid_can_pass_through(
        true,
        &registry,
        missing,
        &dim(),
        block(0),
        block(1)
    ));
    assert_eq!(
        ServerCore::replace_dispense_behavior(
            "shoot",
            "noop",
            &registry,
            missing,
            &dim(),
            block(0),
            Direction::East
        ),
        "shoot"
    );
    assert!(ServerCore::can_piston_push(&registry, missing, &dim(), &piston));
    assert!(ServerCore::is_mod_machine_allowed(
        &registry,
        missing,
        &dim(),
        block(0),
        None
    ));
    assert_eq!(
        ServerCore::replace_block_fetch_on_mod_break(
            "ore",
            "bedrock",
            &registry,
            missing,
            &dim(),
            block(0),
            block(1)
        ),
        "ore"
    );
    assert!(ServerCore::can_mod_cannon_place_block(
        &registry,
        missing,
        &dim(),
        block(0),
        block(1)
    ));

    let mut states = HashMap::new();
    states.insert(block(0), ());
    let kept = ServerCore::on_mod_symmetry_processed(&registry, missing, &dim(), player(2), states);
    assert_eq!(kept.len(), 1);

    let kept = ServerCore::on_mod_collide_entities(
        &registry,
        missing,
        &dim(),
        vec![block(0), block(1)],
        |pos| *pos,
        block(2),
    );
    assert_eq!(kept.len(), 2);

    // Ticks are skipped silently
    let sink = RecordingSink::default();
    ServerCore::on_server_tick_start(&registry, missing, &sink);
    assert!(sink.faults.lock().is_empty());
}

#[test]
fn test_claims_disabled_allows_everything() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), false, ClaimFlags::default())?;
    assert!(!ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(0)));

    // Same saved claims, loaded with claims switched off
    let config = ServerConfig {
        claims_enabled: false,
        ..ServerConfig::default()
    };
    let disabled = Arc::new(ServerData::restore(config, data.save())?);
    registry.register(HANDLE, disabled);
    assert!(ServerCore::can_spread_fire(&registry, HANDLE, &dim(), block(0)));
    Ok(())
}

#[test]
fn test_handshake_reflects_config() {
    let config = ServerConfig {
        parties_enabled: false,
        ..ServerConfig::default()
    };
    let (registry, _data) = registry_with(config);
    let sink = RecordingSink::default();

    ServerCore::on_server_world_info(&registry, HANDLE, player(3), &sink);
    ServerCore::on_server_world_info(&registry, ServerHandle(99), player(4), &sink);

    let packets = sink.packets.lock();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].0, player(3));
    let expected = ClientboundHandshake {
        claims_enabled: true,
        parties_enabled: false,
    };
    assert_eq!(packets[0].1, expected.to_bytes());
    assert_eq!(packets[1].1.as_ref(), &[ClientboundHandshake::ID, 0, 0]);
}

#[test]
fn test_tick_faults_reach_sink() {
    let (registry, data) = registry_with(ServerConfig::default());
    data.record_startup_failure("claims file corrupt");
    let sink = RecordingSink::default();

    ServerCore::on_server_tick_start(&registry, HANDLE, &sink);
    ServerCore::on_server_tick_start(&registry, HANDLE, &sink);

    let faults = sink.faults.lock();
    assert_eq!(
        faults.as_slice(),
        &[TickError::StartupFailed("claims file corrupt".into())]
    );
    assert_eq!(data.current_tick(), 2);
}

#[test]
fn test_party_claim_protects_against_outsiders() -> eyre::Result<()> {
    let (registry, data) = registry_with(ServerConfig::default());
    let party = data.create_party(player(1), "Builders")?;
    data.invite(player(1), player(2))?;
    data.join_party(player(2), party)?;
    data.claim(player(1), &dim(), ChunkPos::new(0, 0), true, ClaimFlags::default())?;
    assert_eq!(
        data.store().owner_at(&dim(), ChunkPos::new(0, 0)),
        Some(Owner::Party(party))
    );

    let item = ItemUse {
        item: "minecraft:stone",
        block: "minecraft:grass_block",
        places_block: true,
    };
    let member = ServerCore::may_use_item_at(
        &registry,
        HANDLE,
        player(2),
        &dim(),
        block(0),
        Direction::Up,
        item,
    );
    let outsider = ServerCore::may_use_item_at(
        &registry,
        HANDLE,
        player(3),
        &dim(),
        block(0),
        Direction::Up,
        item,
    );
    assert!(member);
    assert!(!outsider);
    Ok(())
}
