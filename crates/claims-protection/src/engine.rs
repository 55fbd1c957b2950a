//! Per-action protection decisions.
//!
//! Every function answers "should this action be prevented?" (`true` means
//! deny). They never mutate state and never fail.

use claims_core::{BlockPos, ChunkPos, DimensionId, Direction, Permission, PlayerId};
use claims_store::ClaimView;
use smallvec::SmallVec;
use tracing::trace;

use crate::resolver::ClaimResolver;

type Cells = SmallVec<[ChunkPos; 8]>;

/// What caused an effect on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectSource {
    /// A player acting directly.
    Player(PlayerId),
    /// Something a player is responsible for: a projectile, a thrown potion,
    /// a tamed animal.
    PlayerOwned(PlayerId),
    /// A mob or other source with no responsible player.
    Mob,
}

impl EffectSource {
    const fn responsible_player(self) -> Option<PlayerId> {
        match self {
            Self::Player(player) | Self::PlayerOwned(player) => Some(player),
            Self::Mob => None,
        }
    }
}

/// The entity receiving an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTarget {
    /// Set when the target is itself a player.
    pub player: Option<PlayerId>,
    pub dimension: DimensionId,
    pub pos: BlockPos,
}

/// A player using an item on a block face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemUse<'u> {
    pub item: &'u str,
    pub block: &'u str,
    /// Whether the use places a block against the clicked face.
    pub places_block: bool,
}

/// A piston about to move blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PistonMove<'p> {
    pub piston: BlockPos,
    /// Facing of the piston.
    pub direction: Direction,
    pub extending: bool,
    pub to_push: &'p [BlockPos],
    pub to_destroy: &'p [BlockPos],
}

/// Context of a mod machine or contraption acting on the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModContext {
    /// Block the machine is anchored to or fired from.
    pub anchor: Option<BlockPos>,
    /// Dimension of the anchor, when it is not the target's dimension.
    pub anchor_dimension: Option<DimensionId>,
    /// Player operating the machine, if any.
    pub player: Option<PlayerId>,
    /// Also check the four horizontal neighbors of the target block.
    pub check_neighbors: bool,
}

impl ModContext {
    /// Anchor chunk in `dimension`. An anchor in another dimension counts as
    /// ownerless.
    fn anchor_in(&self, dimension: &DimensionId) -> Option<ChunkPos> {
        let same_dimension = self
            .anchor_dimension
            .as_ref()
            .is_none_or(|anchor| anchor == dimension);
        self.anchor.filter(|_| same_dimension).map(BlockPos::chunk)
    }
}

/// Protection decision functions, one per action class.
pub struct ChunkProtection;

impl ChunkProtection {
    // ==================== Entities ====================

    /// Whether an effect (damage, potion, attack) on an entity should be
    /// prevented.
    ///
    /// Evaluated in the target's dimension. Mob sources and players
    /// affecting themselves are never blocked.
    pub fn on_entity_effect<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        source: Option<EffectSource>,
        target: &EffectTarget,
    ) -> bool {
        let Some(actor) = source.and_then(EffectSource::responsible_player) else {
            return false;
        };
        if target.player == Some(actor) {
            return false;
        }
        let denied = !resolver.has_permission(
            Some(actor),
            &target.dimension,
            target.pos.chunk(),
            Permission::EntityDamage,
        );
        if denied {
            trace!(%actor, dimension = %target.dimension, pos = %target.pos, "entity effect denied");
        }
        denied
    }

    // ==================== Environment ====================

    /// Whether fire should be prevented from spreading to `pos`.
    pub fn on_fire_spread<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        pos: BlockPos,
    ) -> bool {
        !resolver.has_permission(None, dimension, pos.chunk(), Permission::FireSpread)
    }

    /// Whether fluid should be prevented from flowing from `from` to `to`.
    ///
    /// Flow inside one chunk never crosses a claim boundary.
    pub fn on_fluid_spread<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        from: BlockPos,
        to: BlockPos,
    ) -> bool {
        let (source, target) = (from.chunk(), to.chunk());
        if source == target {
            return false;
        }
        !resolver.can_affect(dimension, Some(source), target, Permission::FluidSpread)
    }

    // ==================== Players ====================

    /// Whether a player's item use at `pos` should be prevented.
    ///
    /// The clicked cell needs `Interact` unless the block is exempt. When the
    /// use places a block, the cell receiving it needs `Build`.
    pub fn on_use_item_at<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        player: PlayerId,
        dimension: &DimensionId,
        pos: BlockPos,
        face: Direction,
        item: ItemUse<'_>,
    ) -> bool {
        let config = resolver.config();
        if config.item_use_exceptions.contains(item.item) {
            return false;
        }

        let clicked = pos.chunk();
        if !config.interact_exceptions.contains(item.block)
            && !resolver.has_permission(Some(player), dimension, clicked, Permission::Interact)
        {
            trace!(%player, %dimension, %pos, item = item.item, "item use denied");
            return true;
        }

        if item.places_block {
            let placed = pos.offset(face).chunk();
            if !resolver.has_permission(Some(player), dimension, placed, Permission::Build) {
                trace!(%player, %dimension, %pos, ?face, "block placement denied");
                return true;
            }
        }
        false
    }

    // ==================== Redstone ====================

    /// Whether a dispenser at `pos` facing `facing` should fall back to a
    /// no-op behavior.
    pub fn on_dispense_from<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        pos: BlockPos,
        facing: Direction,
    ) -> bool {
        let source = pos.chunk();
        let target = pos.offset(facing).chunk();
        if source == target {
            return false;
        }
        !resolver.can_affect(dimension, Some(source), target, Permission::Interact)
    }

    /// Whether a piston move should be cancelled.
    ///
    /// All-or-nothing: denied if any affected cell outside the piston's own
    /// chunk refuses it. Affected cells are the head position, every pushed
    /// block and its destination, and every destroyed block.
    pub fn on_piston_push<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        piston: &PistonMove<'_>,
    ) -> bool {
        let source = piston.piston.chunk();
        let motion = if piston.extending {
            piston.direction
        } else {
            piston.direction.opposite()
        };

        let mut cells = Cells::new();
        push_cell(&mut cells, source, piston.piston.offset(piston.direction));
        for pos in piston.to_push {
            push_cell(&mut cells, source, *pos);
            push_cell(&mut cells, source, pos.offset(motion));
        }
        for pos in piston.to_destroy {
            push_cell(&mut cells, source, *pos);
        }

        let denied = cells
            .iter()
            .any(|cell| !resolver.can_affect(dimension, Some(source), *cell, Permission::Build));
        if denied {
            trace!(%dimension, piston = %piston.piston, "piston move denied");
        }
        denied
    }

    // ==================== Mod machines ====================

    /// Whether a mod machine or contraption should be prevented from acting
    /// at `pos`.
    ///
    /// With a player in context the player needs `Build` on every checked
    /// cell. Without one, the anchor's owner is compared to each cell's owner
    /// and the `ModMachine` environment toggle decides across owners.
    pub fn on_mod_machine<V: ClaimView>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        pos: BlockPos,
        context: &ModContext,
    ) -> bool {
        let mut cells = Cells::new();
        cells.push(pos.chunk());
        if context.check_neighbors && resolver.config().check_neighbor_blocks {
            for direction in Direction::HORIZONTAL {
                let cell = pos.offset(direction).chunk();
                if !cells.contains(&cell) {
                    cells.push(cell);
                }
            }
        }

        let denied = match context.player {
            Some(player) => cells
                .iter()
                .any(|cell| !resolver.has_permission(Some(player), dimension, *cell, Permission::Build)),
            None => {
                let source = context.anchor_in(dimension);
                cells.iter().any(|cell| {
                    !resolver.can_affect(dimension, source, *cell, Permission::ModMachine)
                })
            }
        };
        if denied {
            trace!(%dimension, %pos, player = ?context.player, "mod machine denied");
        }
        denied
    }

    /// Keep the items whose position the machine may act on, in order.
    ///
    /// Callers should pass a resolver over a snapshot so the whole batch is
    /// judged against one consistent state.
    pub fn filter_mod_machine<V: ClaimView, T>(
        resolver: &ClaimResolver<'_, V>,
        dimension: &DimensionId,
        items: Vec<T>,
        position: impl Fn(&T) -> BlockPos,
        context: &ModContext,
    ) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| !Self::on_mod_machine(resolver, dimension, position(item), context))
            .collect()
    }
}

/// Record the chunk of `pos` unless it is the source chunk or already listed.
fn push_cell(cells: &mut Cells, source: ChunkPos, pos: BlockPos) {
    let cell = pos.chunk();
    if cell != source && !cells.contains(&cell) {
        cells.push(cell);
    }
}
