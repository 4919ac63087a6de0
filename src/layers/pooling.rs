use crate::error::{Error, Result};
use crate::math::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Valid,
    Same,
}

impl Padding {
    pub fn from_name(name: &str) -> Result<Padding> {
        match name.to_lowercase().as_str() {
            "valid" => Ok(Padding::Valid),
            "same" => Ok(Padding::Same),
            other => Err(Error::UnsupportedPadding(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Padding::Valid => "valid",
            Padding::Same => "same",
        }
    }

    /// Output length along one axis.
    pub fn output_len(&self, input: usize, window: usize, stride: usize) -> Result<usize> {
        match self {
            Padding::Valid => {
                if input < window {
                    return Err(Error::Layer(format!(
                        "Window {} does not fit input length {} with valid padding",
                        window, input
                    )));
                }
                Ok((input - window) / stride + 1)
            }
            Padding::Same => Ok((input + stride - 1) / stride),
        }
    }

    /// Leading (top / left) padding along one axis.
    pub fn leading_pad(&self, input: usize, window: usize, stride: usize, output: usize) -> usize {
        match self {
            Padding::Valid => 0,
            Padding::Same => {
                let total = ((output.saturating_sub(1)) * stride + window).saturating_sub(input);
                total / 2
            }
        }
    }
}

/// Max pooling over HWC feature maps; each channel is pooled independently.
#[derive(Debug, Clone)]
pub struct MaxPooling2D {
    pub name: String,
    pub pool_size: (usize, usize),
    pub strides: (usize, usize),
    pub padding: Padding,
}

/// Per-output window geometry, shared by forward and backward.
struct Geometry {
    in_h: usize,
    in_w: usize,
    channels: usize,
    out_h: usize,
    out_w: usize,
    pad_top: usize,
    pad_left: usize,
}

impl MaxPooling2D {
    /// `strides` defaults to `pool_size` when absent.
    pub fn new(
        name: String,
        pool_size: (usize, usize),
        strides: Option<(usize, usize)>,
        padding: Padding,
    ) -> Result<MaxPooling2D> {
        let strides = strides.unwrap_or(pool_size);
        if pool_size.0 == 0 || pool_size.1 == 0 || strides.0 == 0 || strides.1 == 0 {
            return Err(Error::Layer(format!(
                "MaxPooling2D '{}' needs non-zero pool size and strides",
                name
            )));
        }
        Ok(MaxPooling2D {
            name,
            pool_size,
            strides,
            padding,
        })
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let (in_h, in_w, channels) = match input_shape {
            &[h, w, c] => (h, w, c),
            other => {
                return Err(Error::Layer(format!(
                    "MaxPooling2D '{}' expects HWC input, got {:?}",
                    self.name, other
                )))
            }
        };
        let out_h = self.padding.output_len(in_h, self.pool_size.0, self.strides.0)?;
        let out_w = self.padding.output_len(in_w, self.pool_size.1, self.strides.1)?;
        Ok(vec![out_h, out_w, channels])
    }

    fn geometry(&self, input: &Tensor) -> Result<Geometry> {
        let (in_h, in_w, channels) = input.hwc()?;
        let out_h = self.padding.output_len(in_h, self.pool_size.0, self.strides.0)?;
        let out_w = self.padding.output_len(in_w, self.pool_size.1, self.strides.1)?;
        Ok(Geometry {
            in_h,
            in_w,
            channels,
            out_h,
            out_w,
            pad_top: self.padding.leading_pad(in_h, self.pool_size.0, self.strides.0, out_h),
            pad_left: self.padding.leading_pad(in_w, self.pool_size.1, self.strides.1, out_w),
        })
    }

    /// Flat input offset of the max element of window (oh, ow) in channel c.
    fn window_argmax(&self, g: &Geometry, x: &[f64], oh: usize, ow: usize, c: usize) -> Option<usize> {
        let mut best: Option<usize> = None;
        for kh in 0..self.pool_size.0 {
            let ih = (oh * self.strides.0 + kh).wrapping_sub(g.pad_top);
            if ih >= g.in_h {
                continue;
            }
            for kw in 0..self.pool_size.1 {
                let iw = (ow * self.strides.1 + kw).wrapping_sub(g.pad_left);
                if iw >= g.in_w {
                    continue;
                }
                let idx = (ih * g.in_w + iw) * g.channels + c;
                match best {
                    Some(b) if x[idx] <= x[b] => {}
                    _ => best = Some(idx),
                }
            }
        }
        best
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let g = self.geometry(input)?;
        let x = input.data();
        let mut out = Vec::with_capacity(g.out_h * g.out_w * g.channels);
        for oh in 0..g.out_h {
            for ow in 0..g.out_w {
                for c in 0..g.channels {
                    let v = self
                        .window_argmax(&g, x, oh, ow, c)
                        .map(|idx| x[idx])
                        .unwrap_or(0.0);
                    out.push(v);
                }
            }
        }
        Tensor::new(vec![g.out_h, g.out_w, g.channels], out)
    }

    /// Routes each output gradient back to the input element that won its window.
    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor> {
        let g = self.geometry(input)?;
        let x = input.data();
        let dy = grad_output.data();
        let mut dx = Tensor::zeros(input.shape().to_vec());
        let dx_data = dx.data_mut();
        for oh in 0..g.out_h {
            for ow in 0..g.out_w {
                for c in 0..g.channels {
                    if let Some(idx) = self.window_argmax(&g, x, oh, ow, c) {
                        dx_data[idx] += dy[(oh * g.out_w + ow) * g.channels + c];
                    }
                }
            }
        }
        Ok(dx)
    }
}
