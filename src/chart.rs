//! Chart rendering: predicted vs. actual water levels against the flood
//! level.
//!
//! Two charts are produced per run: the full series, and a zoom window
//! for presentation. Both show the observed water level (green), the
//! forecast level (red), and a horizontal flood-level line (purple).
//! Output is PNG via the plotters bitmap backend.

use plotters::prelude::*;

use crate::model::ChartError;

/// Per-chart rendering options.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Instance index of the first point; nonzero for zoom windows so the
    /// x axis shows absolute instance numbers.
    pub x_offset: usize,
    pub flood_level: f64,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, width: u32, height: u32, flood_level: f64) -> Self {
        ChartSpec {
            title: title.into(),
            width,
            height,
            x_offset: 0,
            flood_level,
        }
    }

    pub fn with_x_offset(mut self, x_offset: usize) -> Self {
        self.x_offset = x_offset;
        self
    }
}

/// Renders an actual-vs-predicted level chart to `path`.
///
/// # Errors
/// - `ChartError::EmptySeries` — either series is empty.
/// - `ChartError::LengthMismatch` — the series lengths differ.
/// - `ChartError::Backend` — the drawing backend failed.
pub fn render_levels_chart(
    actual: &[f64],
    predicted: &[f64],
    spec: &ChartSpec,
    path: &str,
) -> Result<(), ChartError> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ChartError::EmptySeries);
    }
    if actual.len() != predicted.len() {
        return Err(ChartError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChartError::Backend(e.to_string()))?;
        }
    }

    let x_min = spec.x_offset as f64;
    let x_max = (spec.x_offset + actual.len()) as f64;

    // Y range covers both series and the flood line, with a 5% margin.
    let mut y_min = spec.flood_level;
    let mut y_max = spec.flood_level;
    for &v in actual.iter().chain(predicted.iter()) {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }
    let y_margin = ((y_max - y_min) * 0.05).max(0.1);
    let y_range = (y_min - y_margin)..(y_max + y_margin);

    let root = BitMapBackend::new(path, (spec.width, spec.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::Backend(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_range)
        .map_err(|e| ChartError::Backend(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Instance")
        .y_desc("Water Level")
        .draw()
        .map_err(|e| ChartError::Backend(e.to_string()))?;

    let green = RGBColor(44, 160, 44);
    let red = RGBColor(214, 39, 40);
    let purple = RGBColor(128, 0, 128);

    chart
        .draw_series(LineSeries::new(
            actual
                .iter()
                .enumerate()
                .map(|(i, &v)| ((spec.x_offset + i) as f64, v)),
            green.stroke_width(1),
        ))
        .map_err(|e| ChartError::Backend(e.to_string()))?
        .label("Actual Water Level")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], green.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            predicted
                .iter()
                .enumerate()
                .map(|(i, &v)| ((spec.x_offset + i) as f64, v)),
            red.stroke_width(1),
        ))
        .map_err(|e| ChartError::Backend(e.to_string()))?
        .label("Predicted Water Level")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], red.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            [(x_min, spec.flood_level), (x_max, spec.flood_level)],
            purple.stroke_width(2),
        ))
        .map_err(|e| ChartError::Backend(e.to_string()))?
        .label("Flood Level")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], purple.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| ChartError::Backend(e.to_string()))?;

    root.present()
        .map_err(|e| ChartError::Backend(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rising_series(n: usize) -> (Vec<f64>, Vec<f64>) {
        let actual: Vec<f64> = (0..n).map(|i| 3.0 + i as f64 * 0.02).collect();
        let predicted: Vec<f64> = actual.iter().map(|v| v + 0.1).collect();
        (actual, predicted)
    }

    #[test]
    fn test_render_succeeds_for_equal_length_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("levels.png");
        let (actual, predicted) = rising_series(100);

        let spec = ChartSpec::new("Predicted vs. Actual Water Level", 800, 400, 4.0);
        let result = render_levels_chart(&actual, &predicted, &spec, path.to_str().unwrap());
        assert!(result.is_ok(), "render failed: {:?}", result);
        assert!(path.exists());
    }

    #[test]
    fn test_render_zoom_window_with_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zoom.png");
        let (actual, predicted) = rising_series(50);

        let spec = ChartSpec::new(
            "Predicted vs. Actual Water Level (Instances 200 to 250)",
            800,
            400,
            4.0,
        )
        .with_x_offset(200);
        let result = render_levels_chart(&actual, &predicted, &spec, path.to_str().unwrap());
        assert!(result.is_ok(), "render failed: {:?}", result);
        assert!(path.exists());
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let spec = ChartSpec::new("Empty", 400, 300, 4.0);

        let result = render_levels_chart(&[], &[], &spec, path.to_str().unwrap());
        assert!(matches!(result, Err(ChartError::EmptySeries)));
        assert!(!path.exists());
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mismatch.png");
        let spec = ChartSpec::new("Mismatch", 400, 300, 4.0);

        let result =
            render_levels_chart(&[1.0, 2.0, 3.0], &[1.0, 2.0], &spec, path.to_str().unwrap());
        assert!(matches!(
            result,
            Err(ChartError::LengthMismatch { actual: 3, predicted: 2 })
        ));
    }

    #[test]
    fn test_flat_series_still_renders() {
        // Zero vertical spread must not collapse the y range.
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.png");
        let actual = vec![4.0; 20];
        let predicted = vec![4.0; 20];
        let spec = ChartSpec::new("Flat", 400, 300, 4.0);

        let result = render_levels_chart(&actual, &predicted, &spec, path.to_str().unwrap());
        assert!(result.is_ok(), "render failed: {:?}", result);
    }
}
