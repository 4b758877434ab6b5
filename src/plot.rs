use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::analysis::CalibratedSeries;
use crate::error::RigError;

#[derive(Clone, Copy, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 450,
        }
    }
}

/// Render the time-based figure: force and displacement over time.
/// Display only; nothing here feeds back into the analysis.
pub fn render_time_series_png(
    series: &CalibratedSeries,
    style: PlotStyle,
) -> Result<Vec<u8>, RigError> {
    if series.is_empty() {
        return Err(RigError::Plot("no samples to plot".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let t_max = *series.time.last().expect("non-empty series");
        let (y_min, y_max) = value_bounds(
            series
                .force
                .iter()
                .chain(series.displacement.iter())
                .copied(),
        );
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("High-Speed Tensile Tester Data", ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f64..t_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .light_line_style(&BLACK.mix(0.1))
            .draw()?;
        chart
            .draw_series(LineSeries::new(
                series.time.iter().zip(series.force.iter()).map(|(&t, &f)| (t, f)),
                &BLUE,
            ))?
            .label("Force (N)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        chart
            .draw_series(LineSeries::new(
                series
                    .time
                    .iter()
                    .zip(series.displacement.iter())
                    .map(|(&t, &d)| (t, d)),
                &RED,
            ))?
            .label("Displacement (m)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
        chart
            .configure_series_labels()
            .border_style(&BLACK.mix(0.4))
            .background_style(&WHITE)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

/// Render the force-over-displacement figure.
pub fn render_force_displacement_png(
    series: &CalibratedSeries,
    style: PlotStyle,
) -> Result<Vec<u8>, RigError> {
    if series.is_empty() {
        return Err(RigError::Plot("no samples to plot".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let (x_min, x_max) = value_bounds(series.displacement.iter().copied());
        let (y_min, y_max) = value_bounds(series.force.iter().copied());
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Force Over Displacement", ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Displacement (m)")
            .y_desc("Force (N)")
            .light_line_style(&BLACK.mix(0.1))
            .draw()?;
        chart.draw_series(LineSeries::new(
            series
                .displacement
                .iter()
                .zip(series.force.iter())
                .map(|(&d, &f)| (d, f)),
            &BLUE,
        ))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() || (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RigError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| RigError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
