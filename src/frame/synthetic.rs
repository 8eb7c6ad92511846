use crate::frame::{chroma_dim, PlanarFrame, Plane};

/// How chroma samples are laid out in the generated planes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChromaLayout {
    /// Separate U and V planes, `pixel_stride == 1`.
    #[default]
    Planar,
    /// One interleaved UV buffer exposed as two overlapping planes, `pixel_stride == 2`.
    SemiPlanar,
}

/// A fake video source for running the pipeline without camera hardware.
///
/// Produces a gradient background with a bright vertical bar that moves
/// four pixels per frame, so consecutive frames differ in a known band.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    row_padding: usize,
    layout: ChromaLayout,
    next_index: u64,
}

const BAR_WIDTH: u32 = 8;
const BAR_STEP: u32 = 4;
const BAR_LUMA: u8 = 235;

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            row_padding: 0,
            layout: ChromaLayout::Planar,
            next_index: 0,
        }
    }

    /// Add `padding` unused bytes to the end of every plane row.
    pub fn with_row_padding(mut self, padding: usize) -> Self {
        self.row_padding = padding;
        self
    }

    pub fn with_layout(mut self, layout: ChromaLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Generate the next frame in sequence.
    pub fn next_frame(&mut self) -> PlanarFrame {
        let frame = self.frame_at(self.next_index);
        self.next_index += 1;
        frame
    }

    /// Generate frame number `index` without advancing the sequence.
    pub fn frame_at(&self, index: u64) -> PlanarFrame {
        let bar_start = if self.width == 0 {
            0
        } else {
            ((index * BAR_STEP as u64) % self.width as u64) as u32
        };
        let luma = |x: u32, y: u32| {
            let in_bar = x >= bar_start && x < bar_start + BAR_WIDTH;
            if in_bar {
                BAR_LUMA
            } else {
                (32 + (x + y) % 128) as u8
            }
        };
        build_frame(
            self.width,
            self.height,
            self.row_padding,
            self.layout,
            luma,
            |cx, _| 112 + (cx % 32) as u8,
            |_, cy| 144 - (cy % 32) as u8,
        )
    }

    /// A frame where every luma sample is `y` and every chroma pair is `(u, v)`.
    pub fn uniform(width: u32, height: u32, y: u8, u: u8, v: u8) -> PlanarFrame {
        build_frame(
            width,
            height,
            0,
            ChromaLayout::Planar,
            |_, _| y,
            |_, _| u,
            |_, _| v,
        )
    }
}

/// Lay out sample functions into planes with the requested padding and layout.
/// Padding bytes are filled with `0xEE` so accidental reads are visible.
pub fn build_frame(
    width: u32,
    height: u32,
    row_padding: usize,
    layout: ChromaLayout,
    luma: impl Fn(u32, u32) -> u8,
    u: impl Fn(u32, u32) -> u8,
    v: impl Fn(u32, u32) -> u8,
) -> PlanarFrame {
    let y_stride = width as usize + row_padding;
    let mut y_data = vec![0xEE; y_stride * height as usize];
    for row in 0..height {
        for col in 0..width {
            y_data[row as usize * y_stride + col as usize] = luma(col, row);
        }
    }
    let y_plane = Plane::packed(y_data, y_stride);

    let chroma_width = chroma_dim(width);
    let chroma_height = chroma_dim(height);

    let (u_plane, v_plane) = match layout {
        ChromaLayout::Planar => {
            let stride = chroma_width + row_padding;
            let mut u_data = vec![0xEE; stride * chroma_height];
            let mut v_data = vec![0xEE; stride * chroma_height];
            for row in 0..chroma_height {
                for col in 0..chroma_width {
                    u_data[row * stride + col] = u(col as u32, row as u32);
                    v_data[row * stride + col] = v(col as u32, row as u32);
                }
            }
            (Plane::packed(u_data, stride), Plane::packed(v_data, stride))
        }
        ChromaLayout::SemiPlanar => {
            let stride = chroma_width * 2 + row_padding;
            let mut uv = vec![0xEE; stride * chroma_height];
            for row in 0..chroma_height {
                for col in 0..chroma_width {
                    uv[row * stride + col * 2] = u(col as u32, row as u32);
                    uv[row * stride + col * 2 + 1] = v(col as u32, row as u32);
                }
            }
            let len = uv.len();
            let u_data = uv[..len.saturating_sub(1)].to_vec();
            let v_data = uv[len.min(1)..].to_vec();
            (Plane::new(u_data, stride, 2), Plane::new(v_data, stride, 2))
        }
    };

    PlanarFrame::new(width, height, y_plane, u_plane, v_plane)
}
