use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::detection::{BreathMetric, WaveformTable};
use crate::io::WaveformIoError;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    /// start, insp_end, exp_start, end
    pub markers: [RGBColor; 4],
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 500,
            background: RGBColor(10, 10, 10),
            trace: CYAN,
            markers: [GREEN, YELLOW, MAGENTA, RED],
        }
    }
}
/// Flow trace with a vertical marker at each boundary of every accepted breath.
pub fn render_breath_plot_png(
    table: &WaveformTable,
    metrics: &[BreathMetric],
    style: &PlotStyle,
) -> Result<Vec<u8>, WaveformIoError> {
    if table.is_empty() {
        return Err(WaveformIoError::Plot("waveform has no samples".into()));
    }
    let time = table.time();
    let flow = table.flow();
    let (t_min, t_max) = (time[0], time[time.len() - 1]);
    let (y_min, y_max) = flow
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
        (-1.0, 1.0)
    } else {
        (y_min, y_max)
    };
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Flow", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t_min..t_max.max(t_min + f64::EPSILON), y_bounds.0..y_bounds.1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("Time (s)")
            .y_desc("Flow (L/min)")
            .draw()?;
        // Dropouts break the line instead of being drawn through.
        let samples: Vec<(f64, f64)> = time.iter().copied().zip(flow.iter().copied()).collect();
        for run in samples.split(|(_, f)| f.is_nan()).filter(|run| !run.is_empty()) {
            chart.draw_series(LineSeries::new(run.iter().copied(), &style.trace))?;
        }
        for metric in metrics {
            let times = [
                metric.breath_start_time,
                metric.insp_end_time,
                metric.exp_start_time,
                metric.breath_end_time,
            ];
            for (t, color) in times.into_iter().zip(style.markers) {
                chart.draw_series(LineSeries::new(
                    [(t, y_bounds.0), (t, y_bounds.1)],
                    &color,
                ))?;
            }
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WaveformIoError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| WaveformIoError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
