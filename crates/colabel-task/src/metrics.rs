//! Confusion-matrix accumulation and macro-averaged F1.
//!
//! The matrix is rebuilt every run: reset before the passes, filled once
//! per labeled node after the final pass. Macro-F1 averages per-label F1
//! over exactly the labels that actually occur, so an absent label neither
//! helps nor hurts.

/// `(K+1) x (K+1)` confusion counter over labels `1..=K`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    k: usize,
    cells: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(k: usize) -> Self {
        ConfusionMatrix {
            k,
            cells: vec![0; (k + 1) * (k + 1)],
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    fn idx(&self, truth: usize, pred: usize) -> usize {
        truth * (self.k + 1) + pred
    }

    /// Counts one node's final outcome. Both labels must be in `1..=K`.
    pub fn record(&mut self, truth: u32, pred: u32) {
        debug_assert!((1..=self.k as u32).contains(&truth));
        debug_assert!((1..=self.k as u32).contains(&pred));
        let idx = self.idx(truth as usize, pred as usize);
        self.cells[idx] += 1;
    }

    pub fn get(&self, truth: u32, pred: u32) -> u32 {
        self.cells[self.idx(truth as usize, pred as usize)]
    }

    /// Macro-averaged F1 over labels with at least one true occurrence.
    ///
    /// `None` when no label occurs at all (nothing to average over); the
    /// caller decides what a run without labeled nodes is worth.
    pub fn macro_f1(&self) -> Option<f32> {
        let mut total_f1 = 0.0f32;
        let mut counted = 0u32;
        for label in 1..=self.k {
            let mut true_count = 0.0f32;
            let mut pred_count = 0.0f32;
            for other in 1..=self.k {
                true_count += self.cells[self.idx(label, other)] as f32;
                pred_count += self.cells[self.idx(other, label)] as f32;
            }
            if true_count == 0.0 {
                continue;
            }
            counted += 1;
            let correct = self.cells[self.idx(label, label)] as f32;
            if correct > 0.0 {
                let precision = correct / pred_count;
                let recall = correct / true_count;
                total_f1 += 2.0 * precision * recall / (precision + recall);
            }
        }
        if counted == 0 {
            None
        } else {
            Some(total_f1 / counted as f32)
        }
    }
}
