use std::{
    ops::{Deref, DerefMut},
    path::Path,
};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::Board,
        piece::{Colour, Piece, PieceType},
        types::Square,
    },
    errors::NetworkLoadError,
    rng::XorShiftState,
    util::MAX_PLY,
};

use super::{
    accumulator::{Accumulator, FeatureUpdate, UpdateBuffer},
    simd,
};

/// The size of the input layer of the network.
pub const INPUT: usize = 768;
/// The size of the hidden layer of the network.
pub const L1_SIZE: usize = 256;
/// The amount to scale the output of the network by.
/// This is to allow for the sigmoid activation to differentiate positions with
/// a small difference in evaluation.
pub const SCALE: i32 = 400;
/// Quantisation of the feature transformer.
pub const QA: i32 = 255;
/// Quantisation of the output layer.
pub const QB: i32 = 64;
const QAB: i32 = QA * QB;

/// One accumulator per ply of search height, plus the root.
const ACC_STACK_SIZE: usize = MAX_PLY + 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct Align64<T>(pub T);

impl<T, const SIZE: usize> Deref for Align64<[T; SIZE]> {
    type Target = [T; SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<T, const SIZE: usize> DerefMut for Align64<[T; SIZE]> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The quantised weights of a `(768 -> L1_SIZE)x2 -> 1` network.
#[repr(C)]
pub struct NNUEParams {
    pub feature_weights: Align64<[i16; INPUT * L1_SIZE]>,
    pub feature_bias: Align64<[i16; L1_SIZE]>,
    pub output_weights: Align64<[i16; L1_SIZE * 2]>,
    pub output_bias: i16,
}

impl NNUEParams {
    pub const fn num_params() -> usize {
        INPUT * L1_SIZE + L1_SIZE + L1_SIZE * 2 + 1
    }

    /// The size of a serialised network, in bytes.
    pub const fn num_bytes() -> usize {
        Self::num_params() * std::mem::size_of::<i16>()
    }

    /// Allocates a network with every weight set to zero.
    #[allow(clippy::unnecessary_box_returns)]
    fn zeroed() -> Box<Self> {
        // NNUEParams is ~400KB, which must not pass through the stack on its way
        // to the heap, so allocate it in place.
        // SAFETY: every field is an array of i16 or an i16, for which the
        // all-zeroes bitpattern is valid.
        unsafe {
            let layout = std::alloc::Layout::new::<Self>();
            let ptr = std::alloc::alloc_zeroed(layout);
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            Box::from_raw(ptr.cast())
        }
    }

    /// Reads a network from a flat array of little-endian `i16`s, laid out in
    /// field order: feature weights (feature-major), feature bias, output
    /// weights (side to move first), output bias.
    pub fn from_bytes(bytes: &[u8]) -> Result<Box<Self>, NetworkLoadError> {
        if bytes.len() != Self::num_bytes() {
            return Err(NetworkLoadError::WrongSize { expected: Self::num_bytes(), actual: bytes.len() });
        }
        let mut values = bytes.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]]));
        let mut net = Self::zeroed();
        for (dst, src) in net.feature_weights.iter_mut().zip(&mut values) {
            *dst = src;
        }
        for (dst, src) in net.feature_bias.iter_mut().zip(&mut values) {
            *dst = src;
        }
        for (dst, src) in net.output_weights.iter_mut().zip(&mut values) {
            *dst = src;
        }
        net.output_bias = values.next().unwrap_or_default();

        let limit = simd::MAX_OUTPUT_WEIGHT;
        if let Some((index, &value)) =
            net.output_weights.iter().enumerate().find(|&(_, w)| !(-limit..=limit).contains(w))
        {
            return Err(NetworkLoadError::OutputWeightOutOfRange { index, value, limit });
        }

        Ok(net)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Box<Self>, NetworkLoadError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::num_bytes());
        let weights = self.feature_weights.iter().chain(self.feature_bias.iter()).chain(self.output_weights.iter());
        for &w in weights.chain(std::iter::once(&self.output_bias)) {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// A deterministic network used when no weights file is supplied.
    ///
    /// The first `MATERIAL_PAIRS` pairs of neurons count material: each feature
    /// of the perspective's own colour pushes the even neuron of every pair up
    /// and the odd one down by the piece's value in pawns. Around a bias of
    /// half the clipping range, the squared difference of a pair is linear in
    /// material, so the output is a material count worth about one hundred
    /// centipawns a pawn. The remaining neurons carry small pseudo-random
    /// weights, which give the evaluation some texture. Mirroring the output
    /// weights between the two halves makes colour-symmetric positions
    /// evaluate to exactly zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn builtin() -> Box<Self> {
        const MATERIAL_PAIRS: usize = 25;
        const MATERIAL_OUTPUT_WEIGHT: i16 = 81;
        const PAWN_UNITS: [i16; 6] = [1, 3, 3, 5, 9, 0];
        const MIDPOINT: i16 = (QA / 2) as i16;

        let mut net = Self::zeroed();
        let mut rng = XorShiftState::with_seed(0x6C61_7077_696E_67);
        let mut noise = |span: u64| (rng.next() % (2 * span + 1)) as i16 - span as i16;

        for colour in Colour::all() {
            for piece_type in PieceType::all() {
                let piece = Piece::new(colour, piece_type);
                for sq in Square::all() {
                    // white-perspective index; the colour term selects own or enemy pieces.
                    let feature = feature_indices(FeatureUpdate { sq, piece }).0;
                    let row = &mut net.feature_weights[feature * L1_SIZE..(feature + 1) * L1_SIZE];
                    for (neuron, w) in row.iter_mut().enumerate() {
                        *w = if neuron >= MATERIAL_PAIRS * 2 {
                            noise(3)
                        } else if colour != Colour::White {
                            0
                        } else if neuron % 2 == 0 {
                            PAWN_UNITS[piece_type]
                        } else {
                            -PAWN_UNITS[piece_type]
                        };
                    }
                }
            }
        }

        for (neuron, b) in net.feature_bias.iter_mut().enumerate() {
            *b = if neuron < MATERIAL_PAIRS * 2 { MIDPOINT } else { 0 };
        }

        for neuron in 0..L1_SIZE {
            let w = if neuron < MATERIAL_PAIRS * 2 {
                if neuron % 2 == 0 { MATERIAL_OUTPUT_WEIGHT } else { -MATERIAL_OUTPUT_WEIGHT }
            } else {
                noise(1)
            };
            net.output_weights[neuron] = w;
            net.output_weights[L1_SIZE + neuron] = -w;
        }
        net.output_bias = 0;

        net
    }
}

/// Index of a feature in the input layer, from white's and black's perspectives.
/// The black perspective swaps colours and flips ranks, so both sides see
/// their own pieces as "ours" moving up the board.
pub const fn feature_indices(f: FeatureUpdate) -> (usize, usize) {
    const COLOUR_STRIDE: usize = 64 * 6;
    const PIECE_STRIDE: usize = 64;

    let piece_type = f.piece.piece_type().index();
    let colour = f.piece.colour().index();

    let white_idx = colour * COLOUR_STRIDE + piece_type * PIECE_STRIDE + f.sq.index();
    let black_idx = (1 ^ colour) * COLOUR_STRIDE + piece_type * PIECE_STRIDE + f.sq.flip_rank().index();

    (white_idx, black_idx)
}

const fn feature_index(perspective: Colour, f: FeatureUpdate) -> usize {
    let (white, black) = feature_indices(f);
    match perspective {
        Colour::White => white,
        Colour::Black => black,
    }
}

fn weights_of(params: &NNUEParams, feature: usize) -> &[i16; L1_SIZE] {
    &params.feature_weights.as_chunks::<L1_SIZE>().0[feature]
}

/// State of the partial activations of the NNUE network.
///
/// Moves only record their feature changes; the accumulators are brought up
/// to date lazily, when an evaluation is actually requested.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone)]
pub struct NNUEState {
    /// Accumulators for the first layer, indexed by search height.
    pub accumulators: Box<[Accumulator]>,
    /// Index of the current accumulator.
    pub current_acc: usize,
}

impl NNUEState {
    /// Create a new `NNUEState`.
    #[allow(clippy::unnecessary_box_returns)]
    pub fn new(board: &Board, params: &NNUEParams) -> Box<Self> {
        let accumulators = vec![Accumulator::new(&params.feature_bias); ACC_STACK_SIZE].into_boxed_slice();
        let mut state = Box::new(Self { accumulators, current_acc: 0 });
        state.reinit_from(board, params);
        state
    }

    /// Reinitialise the state from a board.
    pub fn reinit_from(&mut self, board: &Board, params: &NNUEParams) {
        self.current_acc = 0;
        let mut white_rows = ArrayVec::<&[i16; L1_SIZE], 64>::new();
        let mut black_rows = ArrayVec::<&[i16; L1_SIZE], 64>::new();
        board.state.piece_layout.visit_pieces(|sq, piece| {
            let (white, black) = feature_indices(FeatureUpdate { sq, piece });
            white_rows.push(weights_of(params, white));
            black_rows.push(weights_of(params, black));
        });
        let acc = &mut self.accumulators[0];
        simd::update(&params.feature_bias, &mut acc.white, &white_rows, &[]);
        simd::update(&params.feature_bias, &mut acc.black, &black_rows, &[]);
        acc.update_buffer = UpdateBuffer::default();
        acc.correct = [true; 2];
    }

    /// Records a move, leaving the new accumulator to be computed on demand.
    pub fn push(&mut self, update_buffer: UpdateBuffer) {
        debug_assert!(self.current_acc + 1 < ACC_STACK_SIZE, "accumulator stack overflow");
        self.current_acc += 1;
        let acc = &mut self.accumulators[self.current_acc];
        acc.update_buffer = update_buffer;
        acc.correct = [false; 2];
    }

    /// Decrement the current accumulator.
    pub fn pop(&mut self) {
        debug_assert!(self.current_acc > 0, "accumulator stack underflow");
        self.current_acc -= 1;
    }

    /// Brings the current accumulator up to date, replaying moves forward from
    /// the most recent materialised accumulator.
    pub fn force(&mut self, params: &NNUEParams) {
        for colour in Colour::all() {
            let mut base = self.current_acc;
            while base > 0 && !self.accumulators[base].correct[colour] {
                base -= 1;
            }
            for idx in base..self.current_acc {
                let (front, back) = self.accumulators.split_at_mut(idx + 1);
                Self::materialise(params, colour, &front[idx], &mut back[0]);
            }
        }
    }

    fn materialise(params: &NNUEParams, colour: Colour, source: &Accumulator, target: &mut Accumulator) {
        let index = |f: &FeatureUpdate| feature_index(colour, *f);
        let adds = target.update_buffer.adds().iter().map(index).collect::<ArrayVec<_, 2>>();
        let subs = target.update_buffer.subs().iter().map(index).collect::<ArrayVec<_, 2>>();
        let input = source.select(colour);
        let output = target.select_mut(colour);
        match (adds.as_slice(), subs.as_slice()) {
            // null move
            (&[], &[]) => *output = *input,
            (&[add], &[sub]) => Self::apply_quiet(params, input, output, add, sub),
            (&[add], &[sub1, sub2]) => Self::apply_capture(params, input, output, add, sub1, sub2),
            (&[add1, add2], &[sub1, sub2]) => Self::apply_castling(params, input, output, add1, add2, sub1, sub2),
            (adds, subs) => {
                debug_assert!(false, "invalid update buffer: {adds:?} {subs:?}");
                *output = *input;
            }
        }
        target.correct[colour] = true;
    }

    /// Move a single piece on the board.
    pub fn apply_quiet(
        params: &NNUEParams,
        input: &Align64<[i16; L1_SIZE]>,
        output: &mut Align64<[i16; L1_SIZE]>,
        add: usize,
        sub: usize,
    ) {
        simd::update(input, output, &[weights_of(params, add)], &[weights_of(params, sub)]);
    }

    /// Make a capture on the board.
    pub fn apply_capture(
        params: &NNUEParams,
        input: &Align64<[i16; L1_SIZE]>,
        output: &mut Align64<[i16; L1_SIZE]>,
        add: usize,
        sub1: usize,
        sub2: usize,
    ) {
        let subs = [weights_of(params, sub1), weights_of(params, sub2)];
        simd::update(input, output, &[weights_of(params, add)], &subs);
    }

    /// Make a castling move on the board.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_castling(
        params: &NNUEParams,
        input: &Align64<[i16; L1_SIZE]>,
        output: &mut Align64<[i16; L1_SIZE]>,
        add1: usize,
        add2: usize,
        sub1: usize,
        sub2: usize,
    ) {
        let adds = [weights_of(params, add1), weights_of(params, add2)];
        let subs = [weights_of(params, sub1), weights_of(params, sub2)];
        simd::update(input, output, &adds, &subs);
    }

    /// Evaluate the final layer on the partial activations.
    pub fn evaluate(&mut self, params: &NNUEParams, stm: Colour) -> i32 {
        self.force(params);
        let acc = &self.accumulators[self.current_acc];

        let (us, them) = (acc.select(stm), acc.select(!stm));

        let output = simd::flatten(us, them, &params.output_weights);

        (output + i32::from(params.output_bias)) * SCALE / QAB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_eval(board: &Board, params: &NNUEParams) -> i32 {
        NNUEState::new(board, params).evaluate(params, board.turn())
    }

    #[test]
    fn startpos_is_balanced() {
        let params = NNUEParams::builtin();
        assert_eq!(fresh_eval(&Board::default(), &params), 0);
    }

    #[test]
    fn material_advantage_is_positive() {
        let params = NNUEParams::builtin();
        let queen_up = Board::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let eval = fresh_eval(&queen_up, &params);
        assert!(eval > 600, "eval {eval}");
        let queen_down = Board::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_eq!(fresh_eval(&queen_down, &params), -eval);
    }

    #[test]
    fn incremental_matches_refresh() {
        let params = NNUEParams::builtin();
        let mut board =
            Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let mut nnue = NNUEState::new(&board, &params);
        let mut rng = XorShiftState::new();
        for _ in 0..40 {
            let moves = board.legal_moves();
            if moves.is_empty() || board.is_draw() {
                break;
            }
            let m = moves[usize::try_from(rng.next() % moves.len() as u64).unwrap()];
            assert!(board.make_move(m, &mut nnue));
            // evaluate only every other ply, so replay covers multi-move chains.
            if board.ply() % 2 == 0 {
                let incremental = nnue.evaluate(&params, board.turn());
                assert_eq!(incremental, fresh_eval(&board, &params), "after {m} in {board}");
            }
        }
        while board.height() > 0 {
            board.unmake_move(&mut nnue);
        }
        assert_eq!(nnue.current_acc, 0);
    }

    #[test]
    fn null_move_copies_the_accumulator() {
        let params = NNUEParams::builtin();
        let board = Board::default();
        let mut nnue = NNUEState::new(&board, &params);
        let before = nnue.evaluate(&params, Colour::White);
        nnue.push(UpdateBuffer::default());
        assert_eq!(nnue.evaluate(&params, Colour::White), before);
        nnue.pop();
    }

    #[test]
    fn serialisation_round_trips() {
        let params = NNUEParams::builtin();
        let bytes = params.to_bytes();
        assert_eq!(bytes.len(), NNUEParams::num_bytes());
        let loaded = NNUEParams::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.feature_weights, params.feature_weights);
        assert_eq!(loaded.feature_bias, params.feature_bias);
        assert_eq!(loaded.output_weights, params.output_weights);
        assert_eq!(loaded.output_bias, params.output_bias);
    }

    #[test]
    fn malformed_networks_are_rejected() {
        assert!(matches!(
            NNUEParams::from_bytes(&[0; 10]),
            Err(NetworkLoadError::WrongSize { actual: 10, .. })
        ));
        let mut bytes = NNUEParams::builtin().to_bytes();
        let first_output = (INPUT * L1_SIZE + L1_SIZE) * 2;
        bytes[first_output..first_output + 2].copy_from_slice(&i16::MAX.to_le_bytes());
        assert!(matches!(
            NNUEParams::from_bytes(&bytes),
            Err(NetworkLoadError::OutputWeightOutOfRange { index: 0, .. })
        ));
    }
}
