//! Recursive release protocol for whole trees.
//!
//! [`Ast::release`] consumes the store and the `Program` root and walks the
//! tree depth-first in post-order: every owned child is torn down before
//! its parent, left to right in declared field order. The walk runs on an
//! explicit heap worklist, never on the call stack, so arbitrarily long
//! rule, card-type and design chains release without stack growth.
//!
//! Missing required children are unrepresentable by construction; the two
//! malformations the arena representation can express, a child owned by
//! more than one parent and a handle outside the store, abort the walk
//! with [`AstError::MalformedTree`]. Nodes that were allocated but never
//! attached to the tree (e.g. discarded during parser error recovery) are
//! not an error; they are dropped with the store and reported in
//! [`ReleaseStats::unreachable`].

use std::fmt;

use la_arena::Idx;
use rustc_hash::FxHashSet;

use crate::ast::*;
use crate::error::AstError;
use crate::module;

/// The kind of a node, as reported to release observers and in
/// [`AstError::MalformedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Block,
    GameFunction,
    CardTypes,
    Rules,
    UserRules,
    Structures,
    InBrakets,
    Ifs,
    InIf,
    Expression,
    Numbers,
    HandRef,
    User,
    UserScore,
    UserCard,
    Deck,
    Design,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Outcome of a successful release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseStats {
    /// Nodes torn down, the `Program` root included.
    pub released: usize,
    /// Nodes that were allocated in the store but not reachable from the
    /// root; dropped together with the store.
    pub unreachable: usize,
}

/// A reference to one node of the tree being released.
#[derive(Debug, Clone, Copy)]
enum NodeRef {
    Program(BlockId),
    Block(BlockId),
    GameFunction(GameFunctionId),
    CardTypes(CardTypesId),
    Rules(RulesId),
    UserRules(UserRulesId),
    Structures(StructuresId),
    InBrakets(InBraketsId),
    Ifs(IfsId),
    InIf(InIfId),
    Expression(ExpressionId),
    Numbers(NumbersId),
    HandRef(HandRefId),
    User(UserId),
    UserScore(UserScoreId),
    UserCard(UserCardId),
    Deck(DeckId),
    Design(DesignId),
}

impl NodeRef {
    fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Program(_) => NodeKind::Program,
            NodeRef::Block(_) => NodeKind::Block,
            NodeRef::GameFunction(_) => NodeKind::GameFunction,
            NodeRef::CardTypes(_) => NodeKind::CardTypes,
            NodeRef::Rules(_) => NodeKind::Rules,
            NodeRef::UserRules(_) => NodeKind::UserRules,
            NodeRef::Structures(_) => NodeKind::Structures,
            NodeRef::InBrakets(_) => NodeKind::InBrakets,
            NodeRef::Ifs(_) => NodeKind::Ifs,
            NodeRef::InIf(_) => NodeKind::InIf,
            NodeRef::Expression(_) => NodeKind::Expression,
            NodeRef::Numbers(_) => NodeKind::Numbers,
            NodeRef::HandRef(_) => NodeKind::HandRef,
            NodeRef::User(_) => NodeKind::User,
            NodeRef::UserScore(_) => NodeKind::UserScore,
            NodeRef::UserCard(_) => NodeKind::UserCard,
            NodeRef::Deck(_) => NodeKind::Deck,
            NodeRef::Design(_) => NodeKind::Design,
        }
    }

    /// The arena slot this reference names, or `None` for the root, which
    /// lives outside the store.
    fn slot(&self) -> Option<(NodeKind, u32)> {
        match *self {
            NodeRef::Program(_) => None,
            NodeRef::Block(id) => Some((NodeKind::Block, raw(id))),
            NodeRef::GameFunction(id) => Some((NodeKind::GameFunction, raw(id))),
            NodeRef::CardTypes(id) => Some((NodeKind::CardTypes, raw(id))),
            NodeRef::Rules(id) => Some((NodeKind::Rules, raw(id))),
            NodeRef::UserRules(id) => Some((NodeKind::UserRules, raw(id))),
            NodeRef::Structures(id) => Some((NodeKind::Structures, raw(id))),
            NodeRef::InBrakets(id) => Some((NodeKind::InBrakets, raw(id))),
            NodeRef::Ifs(id) => Some((NodeKind::Ifs, raw(id))),
            NodeRef::InIf(id) => Some((NodeKind::InIf, raw(id))),
            NodeRef::Expression(id) => Some((NodeKind::Expression, raw(id))),
            NodeRef::Numbers(id) => Some((NodeKind::Numbers, raw(id))),
            NodeRef::HandRef(id) => Some((NodeKind::HandRef, raw(id))),
            NodeRef::User(id) => Some((NodeKind::User, raw(id))),
            NodeRef::UserScore(id) => Some((NodeKind::UserScore, raw(id))),
            NodeRef::UserCard(id) => Some((NodeKind::UserCard, raw(id))),
            NodeRef::Deck(id) => Some((NodeKind::Deck, raw(id))),
            NodeRef::Design(id) => Some((NodeKind::Design, raw(id))),
        }
    }
}

fn raw<T>(idx: Idx<T>) -> u32 {
    u32::from(idx.into_raw())
}

/// One step of the worklist: visit a node (mark it and schedule its
/// children) or tear it down once its subtree is gone.
enum Step {
    Visit(NodeRef),
    Release(NodeKind),
}

impl Ast {
    /// Tear down an entire tree. Consumes the store, so double release is
    /// a compile error rather than a runtime condition.
    pub fn release(self, program: Program) -> Result<ReleaseStats, AstError> {
        self.release_with(program, |_| {})
    }

    /// [`Ast::release`] with a per-node observer, invoked once per node in
    /// teardown (post-) order. Used for node-count diagnostics.
    pub fn release_with<F>(self, program: Program, mut on_release: F) -> Result<ReleaseStats, AstError>
    where
        F: FnMut(NodeKind),
    {
        let total = self.node_count() + 1;
        let mut visited: FxHashSet<(NodeKind, u32)> = FxHashSet::default();
        let mut work: Vec<Step> = vec![Step::Visit(NodeRef::Program(program.block))];
        let mut scratch: Vec<NodeRef> = Vec::new();
        let mut released = 0usize;

        while let Some(step) = work.pop() {
            match step {
                Step::Visit(node) => {
                    if let Some((kind, index)) = node.slot() {
                        if index as usize >= self.arena_len(kind) {
                            return Err(AstError::MalformedTree {
                                kind,
                                index,
                                reason: "handle does not belong to this tree",
                            });
                        }
                        if !visited.insert((kind, index)) {
                            return Err(AstError::MalformedTree {
                                kind,
                                index,
                                reason: "node owned by more than one parent",
                            });
                        }
                    }
                    work.push(Step::Release(node.kind()));
                    scratch.clear();
                    self.collect_children(node, &mut scratch);
                    // Reversed so the leftmost child is processed first.
                    for &child in scratch.iter().rev() {
                        work.push(Step::Visit(child));
                    }
                }
                Step::Release(kind) => {
                    on_release(kind);
                    released += 1;
                }
            }
        }

        let unreachable = total - released;
        module::note_released(released);
        tracing::debug!(released, unreachable, "released abstract syntax tree");
        if unreachable > 0 {
            tracing::warn!(unreachable, "nodes allocated but never attached to the tree");
        }
        Ok(ReleaseStats { released, unreachable })
    }

    fn arena_len(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Program => 1,
            NodeKind::Block => self.blocks.len(),
            NodeKind::GameFunction => self.game_functions.len(),
            NodeKind::CardTypes => self.card_types.len(),
            NodeKind::Rules => self.rules.len(),
            NodeKind::UserRules => self.user_rules.len(),
            NodeKind::Structures => self.structures.len(),
            NodeKind::InBrakets => self.in_brakets.len(),
            NodeKind::Ifs => self.ifs.len(),
            NodeKind::InIf => self.in_ifs.len(),
            NodeKind::Expression => self.expressions.len(),
            NodeKind::Numbers => self.numbers.len(),
            NodeKind::HandRef => self.hand_refs.len(),
            NodeKind::User => self.users.len(),
            NodeKind::UserScore => self.user_scores.len(),
            NodeKind::UserCard => self.user_cards.len(),
            NodeKind::Deck => self.decks.len(),
            NodeKind::Design => self.designs.len(),
        }
    }

    /// Append the owned children of `node`, left to right in declared
    /// field order.
    fn collect_children(&self, node: NodeRef, out: &mut Vec<NodeRef>) {
        match node {
            NodeRef::Program(block) => out.push(NodeRef::Block(block)),
            NodeRef::Block(id) => match &self.blocks[id] {
                Block::Value { rules, .. } | Block::Design { rules, .. } => {
                    out.push(NodeRef::Rules(*rules));
                }
                Block::Type { card_types, rules, .. } => {
                    out.push(NodeRef::CardTypes(*card_types));
                    out.push(NodeRef::Rules(*rules));
                }
                Block::Game { game, .. } => out.push(NodeRef::GameFunction(*game)),
            },
            NodeRef::GameFunction(id) => {
                let game = &self.game_functions[id];
                out.push(NodeRef::CardTypes(game.card_types));
                out.push(NodeRef::Block(game.block));
            }
            NodeRef::CardTypes(id) => match &self.card_types[id] {
                CardTypes::One { .. } => {}
                CardTypes::Multiple { rest, .. } => out.push(NodeRef::CardTypes(*rest)),
            },
            NodeRef::Rules(id) => match &self.rules[id] {
                Rules::Structures { structures } => out.push(NodeRef::Structures(*structures)),
                Rules::MoveCards { left, right, next, .. } => {
                    out.push(NodeRef::HandRef(*left));
                    out.push(NodeRef::HandRef(*right));
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
                Rules::LookAt { hand, next, .. } => {
                    out.push(NodeRef::HandRef(*hand));
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
                Rules::WinnerType { next } | Rules::Tied { next, .. } => {
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
                Rules::User { user_rules } => out.push(NodeRef::UserRules(*user_rules)),
                Rules::Finish { block } => out.push(NodeRef::Block(*block)),
            },
            NodeRef::UserRules(id) => match &self.user_rules[id] {
                UserRules::NumberAssign { score, value, next, .. } => {
                    out.push(NodeRef::UserScore(*score));
                    out.push(NodeRef::Numbers(*value));
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
                UserRules::ArithmeticAssign { score, left, right, next, .. } => {
                    out.push(NodeRef::UserScore(*score));
                    out.push(NodeRef::Numbers(*left));
                    out.push(NodeRef::Numbers(*right));
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
                UserRules::PmOneAssign { score, next, .. } => {
                    out.push(NodeRef::UserScore(*score));
                    if let Some(next) = next {
                        out.push(NodeRef::Rules(*next));
                    }
                }
            },
            NodeRef::Structures(id) => match &self.structures[id] {
                Structures::If { condition, body } | Structures::Elif { condition, body } => {
                    out.push(NodeRef::Ifs(*condition));
                    out.push(NodeRef::InBrakets(*body));
                }
                Structures::Foreach { body, .. } | Structures::Else { body } => {
                    out.push(NodeRef::InBrakets(*body));
                }
            },
            NodeRef::InBrakets(id) => match &self.in_brakets[id] {
                InBrakets::One { rules } => out.push(NodeRef::Rules(*rules)),
                InBrakets::Multiple { left, right } => {
                    out.push(NodeRef::Rules(*left));
                    out.push(NodeRef::Rules(*right));
                }
            },
            NodeRef::Ifs(id) => match &self.ifs[id] {
                Ifs::InIf { in_if } => out.push(NodeRef::InIf(*in_if)),
                Ifs::And { left, right } | Ifs::Or { left, right } => {
                    out.push(NodeRef::InIf(*left));
                    out.push(NodeRef::InIf(*right));
                }
                Ifs::Tied { .. } => {}
            },
            NodeRef::InIf(id) => match &self.in_ifs[id] {
                InIf::Expression { left, right, .. } => {
                    out.push(NodeRef::Expression(*left));
                    out.push(NodeRef::Expression(*right));
                }
                InIf::Value { .. } | InIf::Type { .. } | InIf::ActivateSpecialCards => {}
            },
            NodeRef::Expression(id) => match &self.expressions[id] {
                Expression::Arithmetic { left, right } => {
                    out.push(NodeRef::Expression(*left));
                    out.push(NodeRef::Expression(*right));
                }
                Expression::Numbers { numbers } => out.push(NodeRef::Numbers(*numbers)),
                Expression::Atomic { card, .. } => out.push(NodeRef::UserCard(*card)),
            },
            NodeRef::Numbers(id) => match &self.numbers[id] {
                Numbers::Constant { .. } => {}
                Numbers::Score { score } => out.push(NodeRef::UserScore(*score)),
            },
            NodeRef::HandRef(id) => match &self.hand_refs[id] {
                HandRef::User { user } => out.push(NodeRef::User(*user)),
                HandRef::Deck { deck } => out.push(NodeRef::Deck(*deck)),
            },
            NodeRef::User(_) => {}
            NodeRef::UserScore(id) => out.push(NodeRef::User(self.user_scores[id].user)),
            NodeRef::UserCard(id) => out.push(NodeRef::User(self.user_cards[id].user)),
            NodeRef::Deck(id) => {
                if let Some(inner) = self.decks[id].inner {
                    out.push(NodeRef::Deck(inner));
                }
            }
            NodeRef::Design(id) => {
                if let Some(next) = self.designs[id].next() {
                    out.push(NodeRef::Design(next));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_counts_every_node_once() {
        let mut ast = Ast::new();
        let queen = ast.alloc_one_type("queen".into());
        let king = ast.alloc_multiple_type("king".into(), queen);
        let rules = ast.alloc_winner_type_rule(None);
        let block = ast.alloc_type_block("suits".into(), king, rules);
        let program = Program::new(block);

        let total = ast.node_count() + 1;
        let stats = ast.release(program).unwrap();
        assert_eq!(stats.released, total);
        assert_eq!(stats.unreachable, 0);
    }

    #[test]
    fn test_release_is_post_order_and_ends_with_program() {
        let mut ast = Ast::new();
        let tail = ast.alloc_winner_type_rule(None);
        let head = ast.alloc_tied_rule(false, Some(tail));
        let block = ast.alloc_value_block("score".into(), 10, head);
        let program = Program::new(block);

        let mut order = Vec::new();
        let stats = ast.release_with(program, |kind| order.push(kind)).unwrap();
        assert_eq!(stats.released, 4);
        assert_eq!(
            order,
            [NodeKind::Rules, NodeKind::Rules, NodeKind::Block, NodeKind::Program]
        );
    }

    #[test]
    fn test_release_order_is_left_to_right() {
        let mut ast = Ast::new();
        let queen = ast.alloc_one_type("queen".into());
        let rules = ast.alloc_winner_type_rule(None);
        // Type block owns card types first, rules second.
        let block = ast.alloc_type_block("suits".into(), queen, rules);
        let program = Program::new(block);

        let mut order = Vec::new();
        ast.release_with(program, |kind| order.push(kind)).unwrap();
        assert_eq!(
            order,
            [NodeKind::CardTypes, NodeKind::Rules, NodeKind::Block, NodeKind::Program]
        );
    }

    #[test]
    fn test_release_long_chain_without_stack_growth() {
        let mut ast = Ast::new();
        let mut head = ast.alloc_winner_type_rule(None);
        for _ in 0..100_000 {
            head = ast.alloc_tied_rule(false, Some(head));
        }
        let block = ast.alloc_value_block("long".into(), 0, head);
        let program = Program::new(block);

        let stats = ast.release(program).unwrap();
        assert_eq!(stats.released, 100_003);
        assert_eq!(stats.unreachable, 0);
    }

    #[test]
    fn test_release_detects_doubly_owned_child() {
        let mut ast = Ast::new();
        // One comparison referenced from both sides of an `and` condition.
        let shared = ast.alloc_value_if(Comparison::Greater, 5);
        let condition = ast.alloc_and_if(shared, shared);
        let rules = ast.alloc_winner_type_rule(None);
        let body = ast.alloc_in_brakets(rules);
        let structure = ast.alloc_if_structure(condition, body);
        let rule = ast.alloc_structures_rule(structure);
        let block = ast.alloc_value_block("bad".into(), 0, rule);
        let program = Program::new(block);

        let err = ast.release(program).unwrap_err();
        assert!(matches!(
            err,
            AstError::MalformedTree { kind: NodeKind::InIf, reason: "node owned by more than one parent", .. }
        ));
    }

    #[test]
    fn test_release_detects_foreign_handle() {
        let mut other = Ast::new();
        let _ = other.alloc_winner_type_rule(None);
        let _ = other.alloc_winner_type_rule(None);
        let foreign = other.alloc_winner_type_rule(None);

        let mut ast = Ast::new();
        let head = ast.alloc_tied_rule(true, Some(foreign));
        let block = ast.alloc_value_block("bad".into(), 0, head);
        let program = Program::new(block);

        let err = ast.release(program).unwrap_err();
        assert!(matches!(
            err,
            AstError::MalformedTree { kind: NodeKind::Rules, reason: "handle does not belong to this tree", .. }
        ));
    }

    #[test]
    fn test_release_reports_unreachable_nodes() {
        let mut ast = Ast::new();
        // Allocated during a reduction that was later discarded.
        let _orphan = ast.alloc_constant(99);
        let rules = ast.alloc_winner_type_rule(None);
        let block = ast.alloc_value_block("v".into(), 1, rules);
        let program = Program::new(block);

        let stats = ast.release(program).unwrap();
        assert_eq!(stats.released, 3);
        assert_eq!(stats.unreachable, 1);
    }

    #[test]
    fn test_release_game_block_subtree() {
        let mut ast = Ast::new();
        let types = ast.alloc_one_type("trump".into());
        let inner_rules = ast.alloc_winner_type_rule(None);
        let inner = ast.alloc_design_block("table".into(), inner_rules);
        let game = ast.alloc_game_function(GameFunction {
            deck_size: 40,
            card_types: types,
            cards_per_player: 3,
            rounds: 10,
            round_timer: 30,
            user_starting_score: 0,
            machine_starting_score: 0,
            win_round_condition: "highest".into(),
            win_game_condition: "best_score".into(),
            card_design: "classic".into(),
            back_design: "plain".into(),
            block: inner,
        });
        let block = ast.alloc_game_block("truco".into(), game);
        let program = Program::new(block);

        let mut order = Vec::new();
        let stats = ast.release_with(program, |kind| order.push(kind)).unwrap();
        assert_eq!(stats.released, 6);
        assert_eq!(order.last(), Some(&NodeKind::Program));
        // The game header goes down after both of its children.
        let header = order.iter().position(|k| *k == NodeKind::GameFunction).unwrap();
        let types_pos = order.iter().position(|k| *k == NodeKind::CardTypes).unwrap();
        assert!(types_pos < header);
    }
}
