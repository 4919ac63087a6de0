use rand::Rng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::layers::pooling::Padding;
use crate::math::{Matrix, Tensor};

/// 2D convolution over HWC feature maps.
///
/// The kernel is stored flat in `[kh, kw, in_channels, filters]` order, the
/// same layout Keras uses, so weights move between artifacts without
/// transposition.
#[derive(Debug, Clone)]
pub struct Conv2D {
    pub name: String,
    pub filters: usize,
    pub kernel_size: (usize, usize),
    pub strides: (usize, usize),
    pub padding: Padding,
    pub in_channels: usize,
    pub kernel: Vec<f64>,
    pub bias: Option<Vec<f64>>,
    pub activation: Activation,
}

struct Geometry {
    in_h: usize,
    in_w: usize,
    out_h: usize,
    out_w: usize,
    pad_top: usize,
    pad_left: usize,
}

impl Conv2D {
    /// Builds a layer with zeroed weights; call `init_weights` or load them.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        filters: usize,
        kernel_size: (usize, usize),
        strides: (usize, usize),
        padding: Padding,
        in_channels: usize,
        use_bias: bool,
        activation: Activation,
    ) -> Result<Conv2D> {
        if filters == 0 || kernel_size.0 == 0 || kernel_size.1 == 0 || strides.0 == 0 || strides.1 == 0 {
            return Err(Error::Layer(format!(
                "Conv2D '{}' needs non-zero filters, kernel size and strides",
                name
            )));
        }
        let kernel_len = kernel_size.0 * kernel_size.1 * in_channels * filters;
        Ok(Conv2D {
            name,
            filters,
            kernel_size,
            strides,
            padding,
            in_channels,
            kernel: vec![0.0; kernel_len],
            bias: if use_bias { Some(vec![0.0; filters]) } else { None },
            activation,
        })
    }

    pub fn kernel_shape(&self) -> Vec<usize> {
        vec![self.kernel_size.0, self.kernel_size.1, self.in_channels, self.filters]
    }

    /// He init for ReLU, Xavier otherwise; biases start at zero.
    pub fn init_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let fan_in = self.kernel_size.0 * self.kernel_size.1 * self.in_channels;
        let rows = fan_in;
        let m = match self.activation {
            Activation::ReLU => Matrix::he(rows, self.filters, fan_in, rng),
            _ => Matrix::xavier(rows, self.filters, fan_in, rng),
        };
        self.kernel = m.data;
        if let Some(b) = self.bias.as_mut() {
            b.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let (in_h, in_w, channels) = match input_shape {
            &[h, w, c] => (h, w, c),
            other => {
                return Err(Error::Layer(format!(
                    "Conv2D '{}' expects HWC input, got {:?}",
                    self.name, other
                )))
            }
        };
        if channels != self.in_channels {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_channels],
                actual: vec![channels],
            });
        }
        let out_h = self.padding.output_len(in_h, self.kernel_size.0, self.strides.0)?;
        let out_w = self.padding.output_len(in_w, self.kernel_size.1, self.strides.1)?;
        Ok(vec![out_h, out_w, self.filters])
    }

    fn geometry(&self, input: &Tensor) -> Result<Geometry> {
        let shape = self.output_shape(input.shape())?;
        let (in_h, in_w, _) = input.hwc()?;
        let (out_h, out_w) = (shape[0], shape[1]);
        Ok(Geometry {
            in_h,
            in_w,
            out_h,
            out_w,
            pad_top: self.padding.leading_pad(in_h, self.kernel_size.0, self.strides.0, out_h),
            pad_left: self.padding.leading_pad(in_w, self.kernel_size.1, self.strides.1, out_w),
        })
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let g = self.geometry(input)?;
        let x = input.data();
        let (kh_n, kw_n) = self.kernel_size;
        let c_n = self.in_channels;
        let f_n = self.filters;

        let mut out = vec![0.0; g.out_h * g.out_w * f_n];
        for oh in 0..g.out_h {
            for ow in 0..g.out_w {
                let o_base = (oh * g.out_w + ow) * f_n;
                let acc = &mut out[o_base..o_base + f_n];
                if let Some(b) = &self.bias {
                    acc.copy_from_slice(b);
                }
                for kh in 0..kh_n {
                    let ih = (oh * self.strides.0 + kh).wrapping_sub(g.pad_top);
                    if ih >= g.in_h {
                        continue;
                    }
                    for kw in 0..kw_n {
                        let iw = (ow * self.strides.1 + kw).wrapping_sub(g.pad_left);
                        if iw >= g.in_w {
                            continue;
                        }
                        let x_base = (ih * g.in_w + iw) * c_n;
                        for ic in 0..c_n {
                            let xv = x[x_base + ic];
                            if xv == 0.0 {
                                continue;
                            }
                            let k_base = ((kh * kw_n + kw) * c_n + ic) * f_n;
                            let k_row = &self.kernel[k_base..k_base + f_n];
                            for (a, &k) in acc.iter_mut().zip(k_row) {
                                *a += xv * k;
                            }
                        }
                    }
                }
            }
        }
        self.activation.apply(&mut out);
        Tensor::new(vec![g.out_h, g.out_w, f_n], out)
    }

    /// Accumulates kernel (and bias) gradients into `grads` and returns ∂L/∂input.
    ///
    /// `grad_output` is ∂L/∂a for this layer's activated output `output`.
    pub fn backward(
        &self,
        input: &Tensor,
        output: &Tensor,
        grad_output: &Tensor,
        grads: &mut [Vec<f64>],
    ) -> Result<Tensor> {
        let g = self.geometry(input)?;
        let x = input.data();
        let (kh_n, kw_n) = self.kernel_size;
        let c_n = self.in_channels;
        let f_n = self.filters;

        // δ = ∂L/∂a ⊙ σ'(a)
        let delta: Vec<f64> = grad_output
            .data()
            .iter()
            .zip(output.data())
            .map(|(d, &a)| d * self.activation.derivative_from_output(a))
            .collect();

        let mut dx = Tensor::zeros(input.shape().to_vec());
        let (k_grad, rest) = grads
            .split_first_mut()
            .ok_or_else(|| Error::Layer(format!("Missing gradient buffers for '{}'", self.name)))?;
        let dx_data = dx.data_mut();

        for oh in 0..g.out_h {
            for ow in 0..g.out_w {
                let o_base = (oh * g.out_w + ow) * f_n;
                let d = &delta[o_base..o_base + f_n];
                if let Some(b_grad) = rest.first_mut() {
                    for (bg, &dv) in b_grad.iter_mut().zip(d) {
                        *bg += dv;
                    }
                }
                for kh in 0..kh_n {
                    let ih = (oh * self.strides.0 + kh).wrapping_sub(g.pad_top);
                    if ih >= g.in_h {
                        continue;
                    }
                    for kw in 0..kw_n {
                        let iw = (ow * self.strides.1 + kw).wrapping_sub(g.pad_left);
                        if iw >= g.in_w {
                            continue;
                        }
                        let x_base = (ih * g.in_w + iw) * c_n;
                        for ic in 0..c_n {
                            let k_base = ((kh * kw_n + kw) * c_n + ic) * f_n;
                            let k_row = &self.kernel[k_base..k_base + f_n];
                            let kg_row = &mut k_grad[k_base..k_base + f_n];
                            let xv = x[x_base + ic];
                            let mut back = 0.0;
                            for f in 0..f_n {
                                kg_row[f] += xv * d[f];
                                back += k_row[f] * d[f];
                            }
                            dx_data[x_base + ic] += back;
                        }
                    }
                }
            }
        }
        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn single_filter(kernel: Vec<f64>, bias: f64, padding: Padding) -> Conv2D {
        let mut conv = Conv2D::new("conv".into(), 1, (2, 2), (1, 1), padding, 1, true, Activation::Linear).unwrap();
        conv.kernel = kernel;
        conv.bias = Some(vec![bias]);
        conv
    }

    #[test]
    fn valid_forward_matches_hand_computation() {
        let conv = single_filter(vec![1.0, 0.0, 0.0, 1.0], 0.5, Padding::Valid);
        let input = Tensor::new(vec![3, 3, 1], (1..=9).map(|v| v as f64).collect()).unwrap();
        let out = conv.forward(&input).unwrap();
        assert_eq!(out.shape(), &[2, 2, 1]);
        // Each output is x[i][j] + x[i+1][j+1] + 0.5.
        assert_eq!(out.data(), &[6.5, 8.5, 12.5, 14.5]);
    }

    #[test]
    fn same_padding_keeps_spatial_size() {
        let conv = single_filter(vec![1.0; 4], 0.0, Padding::Same);
        let input = Tensor::new(vec![3, 3, 1], vec![1.0; 9]).unwrap();
        let out = conv.forward(&input).unwrap();
        assert_eq!(out.shape(), &[3, 3, 1]);
        // Bottom-right corner only sees itself.
        assert_eq!(out.data()[8], 1.0);
        assert_eq!(out.data()[0], 4.0);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let conv = Conv2D::new("conv".into(), 4, (3, 3), (1, 1), Padding::Valid, 3, true, Activation::ReLU).unwrap();
        assert!(conv.output_shape(&[8, 8, 1]).is_err());
        assert_eq!(conv.output_shape(&[224, 224, 3]).unwrap(), vec![222, 222, 4]);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut conv = Conv2D::new("conv".into(), 2, (2, 2), (1, 1), Padding::Valid, 2, true, Activation::Tanh).unwrap();
        conv.kernel = (0..16).map(|i| (i as f64 - 8.0) * 0.05).collect();
        conv.bias = Some(vec![0.1, -0.2]);
        let input = Tensor::new(vec![3, 3, 2], (0..18).map(|i| (i as f64) * 0.03 - 0.2).collect()).unwrap();

        // L = sum(outputs), so ∂L/∂a = 1.
        let output = conv.forward(&input).unwrap();
        let ones = Tensor::new(output.shape().to_vec(), vec![1.0; output.len()]).unwrap();
        let mut grads = vec![vec![0.0; conv.kernel.len()], vec![0.0; 2]];
        let dx = conv.backward(&input, &output, &ones, &mut grads).unwrap();

        let loss = |c: &Conv2D, x: &Tensor| c.forward(x).unwrap().data().iter().sum::<f64>();
        let eps = 1e-6;

        let mut bumped = conv.clone();
        bumped.kernel[5] += eps;
        let numeric = (loss(&bumped, &input) - loss(&conv, &input)) / eps;
        assert_abs_diff_eq!(grads[0][5], numeric, epsilon = 1e-4);

        let mut x2 = input.clone();
        x2.data_mut()[7] += eps;
        let numeric_x = (loss(&conv, &x2) - loss(&conv, &input)) / eps;
        assert_abs_diff_eq!(dx.data()[7], numeric_x, epsilon = 1e-4);
    }
}
