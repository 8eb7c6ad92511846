use crate::frame::error::{PipelineError, Result};
use crate::frame::{ChromaOrder, InterleavedYuv, PlanarFrame, Plane};

/// Copy a planar 4:2:0 frame into a contiguous luma + interleaved chroma buffer.
///
/// Luma rows are copied one at a time so that row padding is skipped. Chroma
/// samples are gathered at `row * row_stride + col * pixel_stride` from each
/// chroma plane, which handles fully planar (`pixel_stride == 1`) and
/// semi-planar (`pixel_stride == 2`) sources with the same loop. The pair
/// order follows `order`.
pub fn ingest(frame: &PlanarFrame, order: ChromaOrder) -> Result<InterleavedYuv> {
    validate(frame)?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let chroma_width = frame.chroma_width();
    let chroma_height = frame.chroma_height();

    let mut data = Vec::with_capacity(InterleavedYuv::expected_len(frame.width, frame.height));

    for row in 0..height {
        let start = row * frame.y.row_stride;
        if frame.y.pixel_stride == 1 {
            data.extend_from_slice(&frame.y.data[start..start + width]);
        } else {
            data.extend((0..width).map(|col| frame.y.data[start + col * frame.y.pixel_stride]));
        }
    }

    let (first, second) = match order {
        ChromaOrder::Vu => (&frame.v, &frame.u),
        ChromaOrder::Uv => (&frame.u, &frame.v),
    };
    for row in 0..chroma_height {
        for col in 0..chroma_width {
            data.push(first.data[row * first.row_stride + col * first.pixel_stride]);
            data.push(second.data[row * second.row_stride + col * second.pixel_stride]);
        }
    }

    Ok(InterleavedYuv {
        width: frame.width,
        height: frame.height,
        order,
        data,
    })
}

/// Reject geometry that would make any read fall outside its plane.
fn validate(frame: &PlanarFrame) -> Result<()> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PipelineError::Format(format!(
            "frame dimensions must be positive, got {}x{}",
            frame.width, frame.height
        )));
    }
    check_plane(
        "y",
        &frame.y,
        frame.width as usize,
        frame.height as usize,
    )?;
    check_plane("u", &frame.u, frame.chroma_width(), frame.chroma_height())?;
    check_plane("v", &frame.v, frame.chroma_width(), frame.chroma_height())?;
    Ok(())
}

fn check_plane(name: &str, plane: &Plane, samples: usize, rows: usize) -> Result<()> {
    if plane.pixel_stride == 0 {
        return Err(PipelineError::Format(format!(
            "{name} plane pixel stride must be at least 1"
        )));
    }
    let row_bytes = plane.row_len(samples).ok_or_else(|| {
        PipelineError::Format(format!(
            "{name} plane pixel stride {} overflows a {samples}-sample row",
            plane.pixel_stride
        ))
    })?;
    if plane.row_stride < row_bytes {
        return Err(PipelineError::Format(format!(
            "{name} plane row stride {} is smaller than the {row_bytes} bytes a row needs",
            plane.row_stride
        )));
    }
    let needed = plane.min_len(samples, rows).ok_or_else(|| {
        PipelineError::Format(format!(
            "{name} plane row stride {} overflows {rows} rows",
            plane.row_stride
        ))
    })?;
    // Every offset read below is at most `needed - 1`, so the copy loops
    // cannot overflow once this check passes.
    if plane.data.len() < needed {
        return Err(PipelineError::Format(format!(
            "{name} plane holds {} bytes, geometry needs {needed}",
            plane.data.len()
        )));
    }
    Ok(())
}
