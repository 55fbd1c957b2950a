//! Host entry points.
//!
//! Every hook resolves the state bundle through the gateway first. When the
//! bundle is absent, or claims are disabled, the hook allows the action
//! unchanged (fail-open).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use claims_core::{BlockPos, DimensionId, Direction, PlayerId};
use claims_protection::{
    ChunkProtection, EffectSource, EffectTarget, ItemUse, ModContext, PistonMove,
};
use hashbrown::HashMap;
use tracing::trace;

use crate::data::ServerData;
use crate::error::TickError;
use crate::gateway::{ServerHandle, SessionGateway};
use crate::handshake::{ClientboundHandshake, PacketSink};
use crate::tick::DiagnosticSink;

/// Entry points called by the host at each hooked action.
pub struct ServerCore;

impl ServerCore {
    // ==================== Lifecycle ====================

    /// Run one tick of claims maintenance. Faults, including panics, are
    /// reported to `sink` and never propagate to the host.
    pub fn on_server_tick_start<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        sink: &dyn DiagnosticSink,
    ) {
        let Some(data) = gateway.resolve_state(handle) else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| data.tick_handler().on_tick(&data)));
        match outcome {
            Ok(Ok(report)) => trace!(%handle, tick = report.tick, "claims tick done"),
            Ok(Err(error)) => sink.report(handle, &error),
            Err(payload) => sink.report(
                handle,
                &TickError::Panicked {
                    tick: data.current_tick(),
                    message: panic_message(payload.as_ref()),
                },
            ),
        }
    }

    /// Send the feature handshake to a player entering a world. Without
    /// claims state both features are reported as disabled.
    pub fn on_server_world_info<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        player: PlayerId,
        packets: &dyn PacketSink,
    ) {
        let handshake = gateway.resolve_state(handle).map_or(
            ClientboundHandshake {
                claims_enabled: false,
                parties_enabled: false,
            },
            |data| ClientboundHandshake {
                claims_enabled: data.config().claims_enabled,
                parties_enabled: data.config().parties_enabled,
            },
        );
        packets.send_to_player(player, handshake.to_bytes());
    }

    // ==================== Vanilla actions ====================

    pub fn can_add_living_entity_effect<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        target: &EffectTarget,
        source: Option<EffectSource>,
    ) -> bool {
        let Some(data) = protected_state(gateway, handle) else {
            return true;
        };
        !data.with_resolver(|resolver| ChunkProtection::on_entity_effect(resolver, source, target))
    }

    pub fn can_spread_fire<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        pos: BlockPos,
    ) -> bool {
        let Some(data) = protected_state(gateway, handle) else {
            return true;
        };
        !data.with_resolver(|resolver| ChunkProtection::on_fire_spread(resolver, dimension, pos))
    }

    pub fn may_use_item_at<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        player: PlayerId,
        dimension: &DimensionId,
        pos: BlockPos,
        face: Direction,
        item: ItemUse<'_>,
    ) -> bool {
        let Some(data) = protected_state(gateway, handle) else {
            return true;
        };
        !data.with_resolver(|resolver| {
            ChunkProtection::on_use_item_at(resolver, player, dimension, pos, face, item)
        })
    }

    /// Filter the host's own "can fluid pass" verdict. An existing `false`
    /// stands without a claim lookup.
    pub fn replace_fluid_can_pass_through<G: SessionGateway + ?Sized>(
        current: bool,
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        from: BlockPos,
        to: BlockPos,
    ) -> bool {
        if !current {
            return false;
        }
        let Some(data) = protected_state(gateway, handle) else {
            return true;
        };
        !data.with_resolver(|resolver| {
            ChunkProtection::on_fluid_spread(resolver, dimension, from, to)
        })
    }

    /// `noop` when the dispenser at `pos` must not act, `default` otherwise.
    pub fn replace_dispense_behavior<G: SessionGateway + ?Sized, B: PartialEq>(
        default: B,
        noop: B,
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        pos: BlockPos,
        facing: Direction,
    ) -> B {
        if default == noop {
            return default;
        }
        let Some(data) = protected_state(gateway, handle) else {
            return default;
        };
        let protect = data.with_resolver(|resolver| {
            ChunkProtection::on_dispense_from(resolver, dimension, pos, facing)
        });
        if protect { noop } else { default }
    }

    pub fn can_piston_push<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        piston: &PistonMove<'_>,
    ) -> bool {
        let Some(data) = protected_state(gateway, handle) else {
            return true;
        };
        !data.with_resolver(|resolver| ChunkProtection::on_piston_push(resolver, dimension, piston))
    }

    // ==================== Mod machines ====================

    /// Whether a machine anchored at `anchor` may act on `pos` and its
    /// horizontal neighbors.
    pub fn is_mod_machine_allowed<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        pos: BlockPos,
        anchor: Option<BlockPos>,
    ) -> bool {
        let context = ModContext {
            anchor,
            check_neighbors: true,
            ..ModContext::default()
        };
        mod_allowed(gateway, handle, dimension, pos, &context)
    }

    /// `unbreakable` when a machine at `anchor` must not break `target`,
    /// `actual` otherwise.
    pub fn replace_block_fetch_on_mod_break<G: SessionGateway + ?Sized, S>(
        actual: S,
        unbreakable: S,
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        target: BlockPos,
        anchor: BlockPos,
    ) -> S {
        if Self::is_mod_machine_allowed(gateway, handle, dimension, target, Some(anchor)) {
            actual
        } else {
            unbreakable
        }
    }

    /// Drop the positions `player` may not build at from a mirrored placement.
    pub fn on_mod_symmetry_processed<G: SessionGateway + ?Sized, S>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        player: PlayerId,
        states: HashMap<BlockPos, S>,
    ) -> HashMap<BlockPos, S> {
        let Some(data) = protected_state(gateway, handle) else {
            return states;
        };
        let context = ModContext {
            player: Some(player),
            ..ModContext::default()
        };
        data.with_snapshot_resolver(|resolver| {
            ChunkProtection::filter_mod_machine(
                resolver,
                dimension,
                states.into_iter().collect::<Vec<_>>(),
                |(pos, _): &(BlockPos, S)| *pos,
                &context,
            )
        })
        .into_iter()
        .collect()
    }

    pub fn can_mod_cannon_place_block<G: SessionGateway + ?Sized>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        placer: BlockPos,
        pos: BlockPos,
    ) -> bool {
        let context = ModContext {
            anchor: Some(placer),
            ..ModContext::default()
        };
        mod_allowed(gateway, handle, dimension, pos, &context)
    }

    /// Keep the entities a contraption anchored at `anchor` may collide with,
    /// in their original order.
    pub fn on_mod_collide_entities<G: SessionGateway + ?Sized, E>(
        gateway: &G,
        handle: ServerHandle,
        dimension: &DimensionId,
        entities: Vec<E>,
        position: impl Fn(&E) -> BlockPos,
        anchor: BlockPos,
    ) -> Vec<E> {
        let Some(data) = protected_state(gateway, handle) else {
            return entities;
        };
        let context = ModContext {
            anchor: Some(anchor),
            check_neighbors: true,
            ..ModContext::default()
        };
        data.with_snapshot_resolver(|resolver| {
            ChunkProtection::filter_mod_machine(resolver, dimension, entities, position, &context)
        })
    }
}

/// Bundle for `handle` when claims are enforced there.
fn protected_state<G: SessionGateway + ?Sized>(
    gateway: &G,
    handle: ServerHandle,
) -> Option<Arc<ServerData>> {
    gateway
        .resolve_state(handle)
        .filter(|data| data.config().claims_enabled)
}

fn mod_allowed<G: SessionGateway + ?Sized>(
    gateway: &G,
    handle: ServerHandle,
    dimension: &DimensionId,
    pos: BlockPos,
    context: &ModContext,
) -> bool {
    let Some(data) = protected_state(gateway, handle) else {
        return true;
    };
    !data.with_resolver(|resolver| ChunkProtection::on_mod_machine(resolver, dimension, pos, context))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
