// ============================================================
// Layer 6 — SVG Result Renderer
// ============================================================
// Draws the three experiment charts with plotters:
//
//   train_perplexity.svg — exp(loss) per epoch, y axis covers
//                          at least [1.0, 1.4]
//   test.svg             — truth vs baseline prediction
//   drift.svg            — truth plus one prediction per drift
//                          time, labelled "t = <t> s"
//
// Every sequence chart shows batch element 0, channel 0.
//
// The SVG backend is used without the ttf feature so rendering
// needs no system fonts.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use plotters::prelude::*;

use crate::domain::drift::ExperimentReport;
use crate::domain::traits::ResultRenderer;

const LINE_COLORS: [RGBColor; 6] = [
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
];

/// One polyline on a chart. Unlabelled lines get no legend entry.
struct Line {
    label:  Option<String>,
    color:  RGBColor,
    values: Vec<f64>,
}

impl Line {
    fn new(label: Option<&str>, color: RGBColor, values: impl IntoIterator<Item = f64>) -> Self {
        Self { label: label.map(str::to_owned), color, values: values.into_iter().collect() }
    }
}

/// Writes the charts as SVG files into one directory.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    dir:  PathBuf,
    size: (u32, u32),
}

impl SvgRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), size: (800, 600) }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    fn render_perplexity(&self, report: &ExperimentReport) -> Result<PathBuf> {
        let path = self.dir.join("train_perplexity.svg");
        let line = Line::new(None, BLUE, report.losses.iter().map(|l| l.exp()));
        self.line_chart(&path, "# Epochs", "Perplexity [1]", Some((1.0, 1.4)), &[line])?;
        Ok(path)
    }

    fn render_test(&self, report: &ExperimentReport) -> Result<PathBuf> {
        let path = self.dir.join("test.svg");
        let lines = [
            Line::new(Some("truth"), BLUE, series(&report.truth)),
            Line::new(Some("prediction"), GREEN, series(&report.baseline.prediction)),
        ];
        self.line_chart(&path, "t", "y", None, &lines)?;
        Ok(path)
    }

    fn render_drift(&self, report: &ExperimentReport) -> Result<PathBuf> {
        let path = self.dir.join("drift.svg");
        let mut lines = vec![Line::new(Some("truth"), BLUE, series(&report.truth))];
        for (i, obs) in report.drift.iter().enumerate() {
            let color = LINE_COLORS[i % LINE_COLORS.len()];
            lines.push(Line::new(Some(obs.label().as_str()), color, series(&obs.prediction)));
        }
        self.line_chart(&path, "t", "y", None, &lines)?;
        Ok(path)
    }

    /// Draw `lines` against their sample index. `min_y_range` is
    /// widened, never narrowed, to fit the data.
    fn line_chart(
        &self,
        path:        &Path,
        x_desc:      &str,
        y_desc:      &str,
        min_y_range: Option<(f64, f64)>,
        lines:       &[Line],
    ) -> Result<()> {
        let x_max = lines.iter().map(|l| l.values.len()).max().unwrap_or(0).max(2) - 1;
        let (y_min, y_max) = y_bounds(lines, min_y_range);

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(0f64..x_max as f64, y_min..y_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()
            .map_err(plot_err)?;

        for line in lines {
            let color  = line.color;
            let points = line.values.iter().enumerate().map(|(i, v)| (i as f64, *v));
            let anno = chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(plot_err)?;
            if let Some(label) = &line.label {
                anno
                    .label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }

        if lines.iter().any(|l| l.label.is_some()) {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
        tracing::debug!("Wrote chart '{}'", path.display());
        Ok(())
    }
}

impl ResultRenderer for SvgRenderer {
    fn render(&self, report: &ExperimentReport) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(vec![
            self.render_perplexity(report)?,
            self.render_test(report)?,
            self.render_drift(report)?,
        ])
    }
}

fn series(array: &crate::domain::sequence::SequenceArray) -> Vec<f64> {
    array.series(0, 0).into_iter().map(f64::from).collect()
}

fn y_bounds(lines: &[Line], min_range: Option<(f64, f64)>) -> (f64, f64) {
    let finite = lines.iter().flat_map(|l| l.values.iter().copied()).filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let (mut lo, mut hi) = match min_range {
        Some((a, b)) => (lo.min(a), hi.max(b)),
        None if lo.is_finite() => (lo, hi),
        None => (0.0, 1.0),
    };
    if hi - lo < 1e-9 {
        lo -= 0.5;
        hi += 0.5;
    }
    let pad = if min_range.is_some() { 0.0 } else { 0.05 * (hi - lo) };
    (lo - pad, hi + pad)
}

fn plot_err<E: std::fmt::Debug>(e: E) -> anyhow::Error {
    anyhow!("Plotting failed: {e:?}")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drift::{DriftObservation, Evaluation, DRIFT_TIMES};
    use crate::domain::sequence::SequenceArray;

    fn sine(n: usize, phase: f32) -> SequenceArray {
        let values = (0..n * 2).map(|i| ((i / 2) as f32 * 0.1 + phase).sin()).collect();
        SequenceArray::new([n, 2, 1], values).unwrap()
    }

    fn report() -> ExperimentReport {
        ExperimentReport {
            losses:   vec![0.3, 0.2, 0.1, 0.05],
            truth:    sine(50, 0.0),
            baseline: Evaluation { prediction: sine(50, 0.1), loss: 0.01 },
            drift:    DRIFT_TIMES.iter().map(|&t| DriftObservation::new(t, sine(50, 0.2))).collect(),
        }
    }

    #[test]
    fn test_writes_three_svgs() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path().join("RNN")).with_size(320, 240);
        let paths = renderer.render(&report()).unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["train_perplexity.svg", "test.svg", "drift.svg"]);
        for p in &paths {
            let svg = std::fs::read_to_string(p).unwrap();
            assert!(svg.contains("<svg"));
        }
    }

    #[test]
    fn test_drift_legend_lists_times() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SvgRenderer::new(dir.path()).render(&report()).unwrap();
        let svg = std::fs::read_to_string(&paths[2]).unwrap();
        assert!(svg.contains("t = 1000 s"));
        assert!(svg.contains("truth"));
    }

    #[test]
    fn test_perplexity_range_covers_fixed_window() {
        let line = Line::new(None, BLUE, [1.1, 1.2]);
        assert_eq!(y_bounds(&[line], Some((1.0, 1.4))), (1.0, 1.4));

        let line = Line::new(None, BLUE, [1.1, 2.0]);
        assert_eq!(y_bounds(&[line], Some((1.0, 1.4))), (1.0, 2.0));
    }

    #[test]
    fn test_empty_lines_get_default_range() {
        let line = Line::new(None, BLUE, Vec::new());
        let (lo, hi) = y_bounds(&[line], None);
        assert!(lo < 0.0 && hi > 1.0);
    }
}
