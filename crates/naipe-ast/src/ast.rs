//! AST node definitions for Naipe.
//!
//! Nodes live in per-kind arenas owned by a single [`Ast`] store; parent to
//! child edges are typed arena indices. An index can only name a node that
//! was already allocated, so no chain of continuation links can ever loop
//! back on itself.
//!
//! List-shaped nodes (`CardTypes`, `Rules` continuations, the `Design`
//! chain) end with an explicit terminator (`CardTypes::One`, a `None`
//! continuation link, `DesignLink::Name`). A required child is always a
//! plain index; `Option` appears only where the grammar allows a list to
//! end.

use la_arena::{Arena, Idx};
use smol_str::SmolStr;

use crate::error::AstError;
use crate::module;

pub type BlockId = Idx<Block>;
pub type GameFunctionId = Idx<GameFunction>;
pub type CardTypesId = Idx<CardTypes>;
pub type RulesId = Idx<Rules>;
pub type UserRulesId = Idx<UserRules>;
pub type StructuresId = Idx<Structures>;
pub type InBraketsId = Idx<InBrakets>;
pub type IfsId = Idx<Ifs>;
pub type InIfId = Idx<InIf>;
pub type ExpressionId = Idx<Expression>;
pub type NumbersId = Idx<Numbers>;
pub type HandRefId = Idx<HandRef>;
pub type UserId = Idx<User>;
pub type UserScoreId = Idx<UserScore>;
pub type UserCardId = Idx<UserCard>;
pub type DeckId = Idx<Deck>;
pub type DesignId = Idx<Design>;

// ============================================================================
// Node catalogue
// ============================================================================

/// The root of a parsed Naipe program. Owns exactly one block.
///
/// Not `Copy`: the root is handed to [`Ast::release`] exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    pub block: BlockId,
}

impl Program {
    pub fn new(block: BlockId) -> Self {
        module::note_constructed();
        Self { block }
    }
}

/// A top-level block declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `value <name> = <constant> { rules }`
    Value {
        name: SmolStr,
        constant: i64,
        rules: RulesId,
    },
    /// `type <name> = <card types> { rules }`
    Type {
        name: SmolStr,
        card_types: CardTypesId,
        rules: RulesId,
    },
    /// `game <name> { ... }` with the flat game header
    Game { name: SmolStr, game: GameFunctionId },
    /// `design <name> { rules }`
    Design { name: SmolStr, rules: RulesId },
}

impl Block {
    /// The declared name, present on every variant.
    pub fn name(&self) -> &SmolStr {
        match self {
            Block::Value { name, .. }
            | Block::Type { name, .. }
            | Block::Game { name, .. }
            | Block::Design { name, .. } => name,
        }
    }

    /// The owned rule list of a value, type or design block.
    pub fn rules(&self) -> Result<RulesId, AstError> {
        match self {
            Block::Value { rules, .. } | Block::Type { rules, .. } | Block::Design { rules, .. } => {
                Ok(*rules)
            }
            Block::Game { .. } => Err(AstError::variant_mismatch(
                "Block::Value | Block::Type | Block::Design",
                self.variant_name(),
            )),
        }
    }

    /// The card-type list of a type block.
    pub fn card_types(&self) -> Result<CardTypesId, AstError> {
        match self {
            Block::Type { card_types, .. } => Ok(*card_types),
            _ => Err(AstError::variant_mismatch("Block::Type", self.variant_name())),
        }
    }

    /// The game header of a game block.
    pub fn game_function(&self) -> Result<GameFunctionId, AstError> {
        match self {
            Block::Game { game, .. } => Ok(*game),
            _ => Err(AstError::variant_mismatch("Block::Game", self.variant_name())),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Block::Value { .. } => "Block::Value",
            Block::Type { .. } => "Block::Type",
            Block::Game { .. } => "Block::Game",
            Block::Design { .. } => "Block::Design",
        }
    }
}

/// The flat header of a game block: deck composition, timing and the
/// identifiers that tie the game to its win conditions and card designs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFunction {
    pub deck_size: i64,
    pub card_types: CardTypesId,
    pub cards_per_player: i64,
    pub rounds: i64,
    pub round_timer: i64,
    pub user_starting_score: i64,
    pub machine_starting_score: i64,
    pub win_round_condition: SmolStr,
    pub win_game_condition: SmolStr,
    pub card_design: SmolStr,
    pub back_design: SmolStr,
    pub block: BlockId,
}

/// A singly linked list of card-type names. `One` is the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardTypes {
    One { name: SmolStr },
    Multiple { name: SmolStr, rest: CardTypesId },
}

impl CardTypes {
    pub fn name(&self) -> &SmolStr {
        match self {
            CardTypes::One { name } | CardTypes::Multiple { name, .. } => name,
        }
    }

    pub fn rest(&self) -> Option<CardTypesId> {
        match self {
            CardTypes::One { .. } => None,
            CardTypes::Multiple { rest, .. } => Some(*rest),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            CardTypes::One { .. } => "CardTypes::One",
            CardTypes::Multiple { .. } => "CardTypes::Multiple",
        }
    }
}

/// One link of a rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rules {
    /// A conditional or loop structure.
    Structures { structures: StructuresId },
    /// `move <count> from <left> to <right>`
    MoveCards {
        left: HandRefId,
        right: HandRefId,
        count: i64,
        next: Option<RulesId>,
    },
    /// `look at <count> of <hand>`
    LookAt {
        hand: HandRefId,
        count: i64,
        next: Option<RulesId>,
    },
    /// The round winner is decided by card type.
    WinnerType { next: Option<RulesId> },
    /// A score assignment; the continuation link lives on the assignment.
    User { user_rules: UserRulesId },
    /// Marks the round tied (or not).
    Tied { tied: bool, next: Option<RulesId> },
    /// Ends the rule list with a nested block.
    Finish { block: BlockId },
}

impl Rules {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Rules::Structures { .. } => "Rules::Structures",
            Rules::MoveCards { .. } => "Rules::MoveCards",
            Rules::LookAt { .. } => "Rules::LookAt",
            Rules::WinnerType { .. } => "Rules::WinnerType",
            Rules::User { .. } => "Rules::User",
            Rules::Tied { .. } => "Rules::Tied",
            Rules::Finish { .. } => "Rules::Finish",
        }
    }
}

/// A score assignment rule. Every variant targets one player score and
/// carries the continuation of the enclosing rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRules {
    /// `score <op> <number>`
    NumberAssign {
        score: UserScoreId,
        op: Asignations,
        value: NumbersId,
        next: Option<RulesId>,
    },
    /// `score <op> <number> <arithmetic> <number>`
    ArithmeticAssign {
        score: UserScoreId,
        op: Asignations,
        left: NumbersId,
        arithmetic: Arithmetic,
        right: NumbersId,
        next: Option<RulesId>,
    },
    /// `score++` / `score--`
    PmOneAssign {
        score: UserScoreId,
        op: PmOne,
        next: Option<RulesId>,
    },
}

impl UserRules {
    pub fn score(&self) -> UserScoreId {
        match self {
            UserRules::NumberAssign { score, .. }
            | UserRules::ArithmeticAssign { score, .. }
            | UserRules::PmOneAssign { score, .. } => *score,
        }
    }

    /// Continuation of the enclosing rule list.
    pub fn next(&self) -> Option<RulesId> {
        match self {
            UserRules::NumberAssign { next, .. }
            | UserRules::ArithmeticAssign { next, .. }
            | UserRules::PmOneAssign { next, .. } => *next,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            UserRules::NumberAssign { .. } => "UserRules::NumberAssign",
            UserRules::ArithmeticAssign { .. } => "UserRules::ArithmeticAssign",
            UserRules::PmOneAssign { .. } => "UserRules::PmOneAssign",
        }
    }
}

/// A conditional or loop structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structures {
    If { condition: IfsId, body: InBraketsId },
    Elif { condition: IfsId, body: InBraketsId },
    Foreach { selector: Atomic, body: InBraketsId },
    Else { body: InBraketsId },
}

impl Structures {
    pub fn body(&self) -> InBraketsId {
        match self {
            Structures::If { body, .. }
            | Structures::Elif { body, .. }
            | Structures::Foreach { body, .. }
            | Structures::Else { body } => *body,
        }
    }

    pub fn condition(&self) -> Result<IfsId, AstError> {
        match self {
            Structures::If { condition, .. } | Structures::Elif { condition, .. } => Ok(*condition),
            _ => Err(AstError::variant_mismatch(
                "Structures::If | Structures::Elif",
                self.variant_name(),
            )),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Structures::If { .. } => "Structures::If",
            Structures::Elif { .. } => "Structures::Elif",
            Structures::Foreach { .. } => "Structures::Foreach",
            Structures::Else { .. } => "Structures::Else",
        }
    }
}

/// The bracketed body of a structure: one rule list, or a then/else pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InBrakets {
    One { rules: RulesId },
    Multiple { left: RulesId, right: RulesId },
}

impl InBrakets {
    pub fn left_rules(&self) -> RulesId {
        match self {
            InBrakets::One { rules } => *rules,
            InBrakets::Multiple { left, .. } => *left,
        }
    }

    pub fn right_rules(&self) -> Option<RulesId> {
        match self {
            InBrakets::One { .. } => None,
            InBrakets::Multiple { right, .. } => Some(*right),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            InBrakets::One { .. } => "InBrakets::One",
            InBrakets::Multiple { .. } => "InBrakets::Multiple",
        }
    }
}

/// A structure condition: one comparison, a conjunction, or the tied flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ifs {
    InIf { in_if: InIfId },
    And { left: InIfId, right: InIfId },
    Or { left: InIfId, right: InIfId },
    Tied { tied: bool },
}

impl Ifs {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Ifs::InIf { .. } => "Ifs::InIf",
            Ifs::And { .. } => "Ifs::And",
            Ifs::Or { .. } => "Ifs::Or",
            Ifs::Tied { .. } => "Ifs::Tied",
        }
    }
}

/// A single comparison inside a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InIf {
    /// Compare the active card value against a constant.
    Value { comparison: Comparison, constant: i64 },
    /// Compare the active card type against a type name.
    Type { comparison: Comparison, name: SmolStr },
    /// Special-card activation trigger.
    ActivateSpecialCards,
    /// Compare two expressions.
    Expression {
        left: ExpressionId,
        comparison: Comparison,
        right: ExpressionId,
    },
}

impl InIf {
    pub fn comparison(&self) -> Result<Comparison, AstError> {
        match self {
            InIf::Value { comparison, .. }
            | InIf::Type { comparison, .. }
            | InIf::Expression { comparison, .. } => Ok(*comparison),
            InIf::ActivateSpecialCards => Err(AstError::variant_mismatch(
                "InIf::Value | InIf::Type | InIf::Expression",
                self.variant_name(),
            )),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            InIf::Value { .. } => "InIf::Value",
            InIf::Type { .. } => "InIf::Type",
            InIf::ActivateSpecialCards => "InIf::ActivateSpecialCards",
            InIf::Expression { .. } => "InIf::Expression",
        }
    }
}

/// An arithmetic expression over scores and card atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Arithmetic { left: ExpressionId, right: ExpressionId },
    Numbers { numbers: NumbersId },
    Atomic { card: UserCardId, atomic: Atomic },
}

impl Expression {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Expression::Arithmetic { .. } => "Expression::Arithmetic",
            Expression::Numbers { .. } => "Expression::Numbers",
            Expression::Atomic { .. } => "Expression::Atomic",
        }
    }
}

/// A numeric operand: a literal constant or a player score reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Numbers {
    Constant { value: i64 },
    Score { score: UserScoreId },
}

impl Numbers {
    pub fn constant(&self) -> Result<i64, AstError> {
        match self {
            Numbers::Constant { value } => Ok(*value),
            Numbers::Score { .. } => {
                Err(AstError::variant_mismatch("Numbers::Constant", self.variant_name()))
            }
        }
    }

    pub fn user_score(&self) -> Result<UserScoreId, AstError> {
        match self {
            Numbers::Score { score } => Ok(*score),
            Numbers::Constant { .. } => {
                Err(AstError::variant_mismatch("Numbers::Score", self.variant_name()))
            }
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Numbers::Constant { .. } => "Numbers::Constant",
            Numbers::Score { .. } => "Numbers::Score",
        }
    }
}

/// The target of a move or look-at rule: a player's hand or a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandRef {
    User { user: UserId },
    Deck { deck: DeckId },
}

impl HandRef {
    pub fn variant_name(&self) -> &'static str {
        match self {
            HandRef::User { .. } => "HandRef::User",
            HandRef::Deck { .. } => "HandRef::Deck",
        }
    }
}

/// A player referent: the human player or the machine identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum User {
    Player,
    Identifier,
}

/// A player's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserScore {
    pub user: UserId,
}

/// A player's active card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCard {
    pub user: UserId,
}

/// A deck referent, optionally wrapping an inner deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deck {
    pub inner: Option<DeckId>,
}

/// One link of a card-design chain: a styling attribute that either names
/// its value or continues with the next attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Design {
    pub style: DesignStyle,
    pub link: DesignLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesignStyle {
    RoundBorders,
    ColorBorders,
    BackgroundColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignLink {
    /// Terminal attribute value.
    Name(SmolStr),
    /// Next attribute in the chain.
    Chain(DesignId),
}

impl Design {
    pub fn name(&self) -> Result<&SmolStr, AstError> {
        match &self.link {
            DesignLink::Name(name) => Ok(name),
            DesignLink::Chain(_) => {
                Err(AstError::variant_mismatch("DesignLink::Name", "DesignLink::Chain"))
            }
        }
    }

    pub fn next(&self) -> Option<DesignId> {
        match self.link {
            DesignLink::Name(_) => None,
            DesignLink::Chain(next) => Some(next),
        }
    }
}

// ============================================================================
// Operator tags
// ============================================================================

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arithmetic {
    Add,
    Div,
    Mul,
    Sub,
    Mod,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asignations {
    Equal,
    AddEqual,
    SubEqual,
}

/// Increment/decrement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PmOne {
    Increase,
    Decrease,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Greater,
    Lower,
    EqualEqual,
    GreaterOrEqual,
    LowerOrEqual,
    Different,
}

/// Card atom selectors: the value or the type of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atomic {
    Value,
    Type,
}

// ============================================================================
// The store
// ============================================================================

/// Owns every node of one tree under construction or traversal.
///
/// The parser allocates with the `alloc_*` constructors, one per node
/// variant; downstream passes read nodes back through the indexing
/// accessors and the chain iterators. [`Ast::release`] consumes the store,
/// so a released tree cannot be touched again.
#[derive(Debug, Default)]
pub struct Ast {
    pub(crate) blocks: Arena<Block>,
    pub(crate) game_functions: Arena<GameFunction>,
    pub(crate) card_types: Arena<CardTypes>,
    pub(crate) rules: Arena<Rules>,
    pub(crate) user_rules: Arena<UserRules>,
    pub(crate) structures: Arena<Structures>,
    pub(crate) in_brakets: Arena<InBrakets>,
    pub(crate) ifs: Arena<Ifs>,
    pub(crate) in_ifs: Arena<InIf>,
    pub(crate) expressions: Arena<Expression>,
    pub(crate) numbers: Arena<Numbers>,
    pub(crate) hand_refs: Arena<HandRef>,
    pub(crate) users: Arena<User>,
    pub(crate) user_scores: Arena<UserScore>,
    pub(crate) user_cards: Arena<UserCard>,
    pub(crate) decks: Arena<Deck>,
    pub(crate) designs: Arena<Design>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes allocated in the store, not counting the `Program`
    /// root handle.
    pub fn node_count(&self) -> usize {
        self.blocks.len()
            + self.game_functions.len()
            + self.card_types.len()
            + self.rules.len()
            + self.user_rules.len()
            + self.structures.len()
            + self.in_brakets.len()
            + self.ifs.len()
            + self.in_ifs.len()
            + self.expressions.len()
            + self.numbers.len()
            + self.hand_refs.len()
            + self.users.len()
            + self.user_scores.len()
            + self.user_cards.len()
            + self.decks.len()
            + self.designs.len()
    }

    // ------------------------------------------------------------------
    // Constructors, one per variant
    // ------------------------------------------------------------------

    pub fn alloc_value_block(&mut self, name: SmolStr, constant: i64, rules: RulesId) -> BlockId {
        module::note_constructed();
        self.blocks.alloc(Block::Value { name, constant, rules })
    }

    pub fn alloc_type_block(
        &mut self,
        name: SmolStr,
        card_types: CardTypesId,
        rules: RulesId,
    ) -> BlockId {
        module::note_constructed();
        self.blocks.alloc(Block::Type { name, card_types, rules })
    }

    pub fn alloc_game_block(&mut self, name: SmolStr, game: GameFunctionId) -> BlockId {
        module::note_constructed();
        self.blocks.alloc(Block::Game { name, game })
    }

    pub fn alloc_design_block(&mut self, name: SmolStr, rules: RulesId) -> BlockId {
        module::note_constructed();
        self.blocks.alloc(Block::Design { name, rules })
    }

    pub fn alloc_game_function(&mut self, game: GameFunction) -> GameFunctionId {
        module::note_constructed();
        self.game_functions.alloc(game)
    }

    pub fn alloc_one_type(&mut self, name: SmolStr) -> CardTypesId {
        module::note_constructed();
        self.card_types.alloc(CardTypes::One { name })
    }

    pub fn alloc_multiple_type(&mut self, name: SmolStr, rest: CardTypesId) -> CardTypesId {
        module::note_constructed();
        self.card_types.alloc(CardTypes::Multiple { name, rest })
    }

    pub fn alloc_structures_rule(&mut self, structures: StructuresId) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::Structures { structures })
    }

    pub fn alloc_move_cards_rule(
        &mut self,
        left: HandRefId,
        right: HandRefId,
        count: i64,
        next: Option<RulesId>,
    ) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::MoveCards { left, right, count, next })
    }

    pub fn alloc_look_at_rule(
        &mut self,
        hand: HandRefId,
        count: i64,
        next: Option<RulesId>,
    ) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::LookAt { hand, count, next })
    }

    pub fn alloc_winner_type_rule(&mut self, next: Option<RulesId>) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::WinnerType { next })
    }

    pub fn alloc_user_rule(&mut self, user_rules: UserRulesId) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::User { user_rules })
    }

    pub fn alloc_tied_rule(&mut self, tied: bool, next: Option<RulesId>) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::Tied { tied, next })
    }

    pub fn alloc_finish_rule(&mut self, block: BlockId) -> RulesId {
        module::note_constructed();
        self.rules.alloc(Rules::Finish { block })
    }

    pub fn alloc_number_assign(
        &mut self,
        score: UserScoreId,
        op: Asignations,
        value: NumbersId,
        next: Option<RulesId>,
    ) -> UserRulesId {
        module::note_constructed();
        self.user_rules.alloc(UserRules::NumberAssign { score, op, value, next })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn alloc_arithmetic_assign(
        &mut self,
        score: UserScoreId,
        op: Asignations,
        left: NumbersId,
        arithmetic: Arithmetic,
        right: NumbersId,
        next: Option<RulesId>,
    ) -> UserRulesId {
        module::note_constructed();
        self.user_rules
            .alloc(UserRules::ArithmeticAssign { score, op, left, arithmetic, right, next })
    }

    pub fn alloc_pm_one_assign(
        &mut self,
        score: UserScoreId,
        op: PmOne,
        next: Option<RulesId>,
    ) -> UserRulesId {
        module::note_constructed();
        self.user_rules.alloc(UserRules::PmOneAssign { score, op, next })
    }

    pub fn alloc_if_structure(&mut self, condition: IfsId, body: InBraketsId) -> StructuresId {
        module::note_constructed();
        self.structures.alloc(Structures::If { condition, body })
    }

    pub fn alloc_elif_structure(&mut self, condition: IfsId, body: InBraketsId) -> StructuresId {
        module::note_constructed();
        self.structures.alloc(Structures::Elif { condition, body })
    }

    pub fn alloc_foreach_structure(&mut self, selector: Atomic, body: InBraketsId) -> StructuresId {
        module::note_constructed();
        self.structures.alloc(Structures::Foreach { selector, body })
    }

    pub fn alloc_else_structure(&mut self, body: InBraketsId) -> StructuresId {
        module::note_constructed();
        self.structures.alloc(Structures::Else { body })
    }

    pub fn alloc_in_brakets(&mut self, rules: RulesId) -> InBraketsId {
        module::note_constructed();
        self.in_brakets.alloc(InBrakets::One { rules })
    }

    pub fn alloc_in_brakets_pair(&mut self, left: RulesId, right: RulesId) -> InBraketsId {
        module::note_constructed();
        self.in_brakets.alloc(InBrakets::Multiple { left, right })
    }

    pub fn alloc_single_if(&mut self, in_if: InIfId) -> IfsId {
        module::note_constructed();
        self.ifs.alloc(Ifs::InIf { in_if })
    }

    pub fn alloc_and_if(&mut self, left: InIfId, right: InIfId) -> IfsId {
        module::note_constructed();
        self.ifs.alloc(Ifs::And { left, right })
    }

    pub fn alloc_or_if(&mut self, left: InIfId, right: InIfId) -> IfsId {
        module::note_constructed();
        self.ifs.alloc(Ifs::Or { left, right })
    }

    pub fn alloc_tied_if(&mut self, tied: bool) -> IfsId {
        module::note_constructed();
        self.ifs.alloc(Ifs::Tied { tied })
    }

    pub fn alloc_value_if(&mut self, comparison: Comparison, constant: i64) -> InIfId {
        module::note_constructed();
        self.in_ifs.alloc(InIf::Value { comparison, constant })
    }

    pub fn alloc_type_if(&mut self, comparison: Comparison, name: SmolStr) -> InIfId {
        module::note_constructed();
        self.in_ifs.alloc(InIf::Type { comparison, name })
    }

    pub fn alloc_special_cards_if(&mut self) -> InIfId {
        module::note_constructed();
        self.in_ifs.alloc(InIf::ActivateSpecialCards)
    }

    pub fn alloc_expression_if(
        &mut self,
        left: ExpressionId,
        comparison: Comparison,
        right: ExpressionId,
    ) -> InIfId {
        module::note_constructed();
        self.in_ifs.alloc(InIf::Expression { left, comparison, right })
    }

    pub fn alloc_arithmetic_expression(
        &mut self,
        left: ExpressionId,
        right: ExpressionId,
    ) -> ExpressionId {
        module::note_constructed();
        self.expressions.alloc(Expression::Arithmetic { left, right })
    }

    pub fn alloc_numbers_expression(&mut self, numbers: NumbersId) -> ExpressionId {
        module::note_constructed();
        self.expressions.alloc(Expression::Numbers { numbers })
    }

    pub fn alloc_atomic_expression(&mut self, card: UserCardId, atomic: Atomic) -> ExpressionId {
        module::note_constructed();
        self.expressions.alloc(Expression::Atomic { card, atomic })
    }

    pub fn alloc_constant(&mut self, value: i64) -> NumbersId {
        module::note_constructed();
        self.numbers.alloc(Numbers::Constant { value })
    }

    pub fn alloc_score_number(&mut self, score: UserScoreId) -> NumbersId {
        module::note_constructed();
        self.numbers.alloc(Numbers::Score { score })
    }

    pub fn alloc_user_hand(&mut self, user: UserId) -> HandRefId {
        module::note_constructed();
        self.hand_refs.alloc(HandRef::User { user })
    }

    pub fn alloc_deck_hand(&mut self, deck: DeckId) -> HandRefId {
        module::note_constructed();
        self.hand_refs.alloc(HandRef::Deck { deck })
    }

    pub fn alloc_user(&mut self, user: User) -> UserId {
        module::note_constructed();
        self.users.alloc(user)
    }

    pub fn alloc_user_score(&mut self, user: UserId) -> UserScoreId {
        module::note_constructed();
        self.user_scores.alloc(UserScore { user })
    }

    pub fn alloc_user_card(&mut self, user: UserId) -> UserCardId {
        module::note_constructed();
        self.user_cards.alloc(UserCard { user })
    }

    pub fn alloc_deck(&mut self, inner: Option<DeckId>) -> DeckId {
        module::note_constructed();
        self.decks.alloc(Deck { inner })
    }

    pub fn alloc_design_name(&mut self, style: DesignStyle, name: SmolStr) -> DesignId {
        module::note_constructed();
        self.designs.alloc(Design { style, link: DesignLink::Name(name) })
    }

    pub fn alloc_design_chain(&mut self, style: DesignStyle, next: DesignId) -> DesignId {
        module::note_constructed();
        self.designs.alloc(Design { style, link: DesignLink::Chain(next) })
    }

    // ------------------------------------------------------------------
    // Read-only access
    // ------------------------------------------------------------------

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn game_function(&self, id: GameFunctionId) -> &GameFunction {
        &self.game_functions[id]
    }

    pub fn card_type(&self, id: CardTypesId) -> &CardTypes {
        &self.card_types[id]
    }

    pub fn rule(&self, id: RulesId) -> &Rules {
        &self.rules[id]
    }

    pub fn user_rule(&self, id: UserRulesId) -> &UserRules {
        &self.user_rules[id]
    }

    pub fn structure(&self, id: StructuresId) -> &Structures {
        &self.structures[id]
    }

    pub fn in_brakets(&self, id: InBraketsId) -> &InBrakets {
        &self.in_brakets[id]
    }

    pub fn ifs(&self, id: IfsId) -> &Ifs {
        &self.ifs[id]
    }

    pub fn in_if(&self, id: InIfId) -> &InIf {
        &self.in_ifs[id]
    }

    pub fn expression(&self, id: ExpressionId) -> &Expression {
        &self.expressions[id]
    }

    pub fn numbers(&self, id: NumbersId) -> &Numbers {
        &self.numbers[id]
    }

    pub fn hand_ref(&self, id: HandRefId) -> &HandRef {
        &self.hand_refs[id]
    }

    pub fn user(&self, id: UserId) -> &User {
        &self.users[id]
    }

    pub fn user_score(&self, id: UserScoreId) -> &UserScore {
        &self.user_scores[id]
    }

    pub fn user_card(&self, id: UserCardId) -> &UserCard {
        &self.user_cards[id]
    }

    pub fn deck(&self, id: DeckId) -> &Deck {
        &self.decks[id]
    }

    pub fn design(&self, id: DesignId) -> &Design {
        &self.designs[id]
    }

    // ------------------------------------------------------------------
    // Chain traversal
    // ------------------------------------------------------------------

    /// The rule that follows `id` in its rule list, resolving the
    /// continuation stored on an embedded score assignment.
    pub fn rules_continuation(&self, id: RulesId) -> Option<RulesId> {
        match &self.rules[id] {
            Rules::MoveCards { next, .. }
            | Rules::LookAt { next, .. }
            | Rules::WinnerType { next }
            | Rules::Tied { next, .. } => *next,
            Rules::User { user_rules } => self.user_rules[*user_rules].next(),
            Rules::Structures { .. } | Rules::Finish { .. } => None,
        }
    }

    /// Iterate the card-type names of a chain in declaration order.
    pub fn card_type_chain(&self, head: CardTypesId) -> CardTypeChain<'_> {
        CardTypeChain { ast: self, next: Some(head) }
    }

    /// Iterate a rule list, following continuation links.
    pub fn rules_chain(&self, head: RulesId) -> RulesChain<'_> {
        RulesChain { ast: self, next: Some(head) }
    }

    /// Iterate a design chain from its head attribute.
    pub fn design_chain(&self, head: DesignId) -> DesignChain<'_> {
        DesignChain { ast: self, next: Some(head) }
    }
}

pub struct CardTypeChain<'a> {
    ast: &'a Ast,
    next: Option<CardTypesId>,
}

impl<'a> Iterator for CardTypeChain<'a> {
    type Item = &'a SmolStr;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &self.ast.card_types[id];
        self.next = node.rest();
        Some(node.name())
    }
}

pub struct RulesChain<'a> {
    ast: &'a Ast,
    next: Option<RulesId>,
}

impl<'a> Iterator for RulesChain<'a> {
    type Item = (RulesId, &'a Rules);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.ast.rules_continuation(id);
        Some((id, &self.ast.rules[id]))
    }
}

pub struct DesignChain<'a> {
    ast: &'a Ast,
    next: Option<DesignId>,
}

impl<'a> Iterator for DesignChain<'a> {
    type Item = &'a Design;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &self.ast.designs[id];
        self.next = node.next();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_accessors() {
        let mut ast = Ast::new();
        let rules = ast.alloc_winner_type_rule(None);
        let block = ast.alloc_value_block("score".into(), 10, rules);
        let block = ast.block(block);
        assert_eq!(block.name().as_str(), "score");
        assert_eq!(block.rules(), Ok(rules));
        assert!(matches!(block.game_function(), Err(AstError::VariantMismatch { .. })));
    }

    #[test]
    fn test_numbers_variant_mismatch() {
        let mut ast = Ast::new();
        let constant = ast.alloc_constant(7);
        let node = ast.numbers(constant);
        assert_eq!(node.constant(), Ok(7));
        let err = node.user_score().unwrap_err();
        assert_eq!(
            err,
            AstError::VariantMismatch {
                expected: "Numbers::Score",
                found: "Numbers::Constant",
            }
        );
    }

    #[test]
    fn test_card_type_chain_in_order() {
        let mut ast = Ast::new();
        let queen = ast.alloc_one_type("queen".into());
        let king = ast.alloc_multiple_type("king".into(), queen);
        let ace = ast.alloc_multiple_type("ace".into(), king);
        let names: Vec<&str> = ast.card_type_chain(ace).map(|n| n.as_str()).collect();
        assert_eq!(names, ["ace", "king", "queen"]);
    }

    #[test]
    fn test_card_type_chain_length_is_bounded() {
        let mut ast = Ast::new();
        let mut head = ast.alloc_one_type("t0".into());
        for i in 1..50 {
            head = ast.alloc_multiple_type(format!("t{i}").into(), head);
        }
        assert_eq!(ast.card_type_chain(head).count(), 50);
    }

    #[test]
    fn test_rules_chain_follows_user_rules_continuation() {
        let mut ast = Ast::new();
        let tail = ast.alloc_winner_type_rule(None);
        let user = ast.alloc_user(User::Player);
        let score = ast.alloc_user_score(user);
        let value = ast.alloc_constant(3);
        let assign = ast.alloc_number_assign(score, Asignations::AddEqual, value, Some(tail));
        let head = ast.alloc_user_rule(assign);

        let chain: Vec<RulesId> = ast.rules_chain(head).map(|(id, _)| id).collect();
        assert_eq!(chain, vec![head, tail]);
    }

    #[test]
    fn test_rules_chain_stops_at_finish() {
        let mut ast = Ast::new();
        let inner_rules = ast.alloc_winner_type_rule(None);
        let inner = ast.alloc_value_block("end".into(), 0, inner_rules);
        let finish = ast.alloc_finish_rule(inner);
        let head = ast.alloc_tied_rule(true, Some(finish));

        let variants: Vec<&str> =
            ast.rules_chain(head).map(|(_, rule)| rule.variant_name()).collect();
        assert_eq!(variants, ["Rules::Tied", "Rules::Finish"]);
    }

    #[test]
    fn test_design_chain() {
        let mut ast = Ast::new();
        let tail = ast.alloc_design_name(DesignStyle::BackgroundColor, "blue".into());
        let head = ast.alloc_design_chain(DesignStyle::RoundBorders, tail);

        let styles: Vec<DesignStyle> = ast.design_chain(head).map(|d| d.style).collect();
        assert_eq!(styles, [DesignStyle::RoundBorders, DesignStyle::BackgroundColor]);
        assert_eq!(ast.design(tail).name().unwrap().as_str(), "blue");
        assert!(ast.design(head).name().is_err());
    }

    #[test]
    fn test_structures_condition_mismatch() {
        let mut ast = Ast::new();
        let rules = ast.alloc_winner_type_rule(None);
        let body = ast.alloc_in_brakets(rules);
        let else_structure = ast.alloc_else_structure(body);
        assert!(matches!(
            ast.structure(else_structure).condition(),
            Err(AstError::VariantMismatch { .. })
        ));
    }

    #[test]
    fn test_node_count() {
        let mut ast = Ast::new();
        assert_eq!(ast.node_count(), 0);
        let rules = ast.alloc_winner_type_rule(None);
        let _block = ast.alloc_value_block("v".into(), 1, rules);
        assert_eq!(ast.node_count(), 2);
    }
}
