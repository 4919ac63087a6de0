use crate::optim::Optimizer;

/// Adam with bias correction folded into the step size.
///
/// Moment buffers are keyed by parameter slot and allocated lazily on first
/// use, so the optimizer needs no knowledge of the model layout.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: u64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of completed `begin_step` calls.
    pub fn iterations(&self) -> u64 {
        self.t
    }

    fn buffers(&mut self, slot: usize, len: usize) -> (&mut Vec<f64>, &mut Vec<f64>) {
        if self.m.len() <= slot {
            self.m.resize_with(slot + 1, Vec::new);
            self.v.resize_with(slot + 1, Vec::new);
        }
        if self.m[slot].len() != len {
            self.m[slot] = vec![0.0; len];
            self.v[slot] = vec![0.0; len];
        }
        (&mut self.m[slot], &mut self.v[slot])
    }
}

impl Default for Adam {
    fn default() -> Self {
        Adam::new(0.001)
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        "adam"
    }

    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn step(&mut self, slot: usize, params: &mut [f64], grads: &[f64]) {
        let t = self.t.max(1) as i32;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let lr_t = self.learning_rate * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));

        let (m, v) = self.buffers(slot, params.len());
        for (((p, g), m), v) in params.iter_mut().zip(grads).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + epsilon);
        }
    }
}
