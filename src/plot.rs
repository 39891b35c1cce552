//! Focus-curve plots.

use plotters::prelude::*;

use crate::session::FocusResult;

impl FocusResult {
    /// Plot the measured FWHM samples, the fitted curve and the best focus
    /// to `{mode_name}.svg`.
    pub fn plot(&self) {
        let filename = format!("{}.svg", self.mode_name);
        let plot = SVGBackend::new(&filename, (768, 512)).into_drawing_area();
        plot.fill(&WHITE).unwrap();

        let (x1, x2) = self.curve.span();
        let xrange = x2 - x1;
        let modeled: Vec<(f64, f64)> = (0..1000)
            .map(|i| {
                let x = x1 + xrange * i as f64 / 999.0;
                (x, self.curve.value(x))
            })
            .collect();
        let y_min = self
            .fwhm_series
            .iter()
            .chain(modeled.iter().map(|(_, y)| y))
            .cloned()
            .fold(f64::INFINITY, f64::min);
        let y_max = self
            .fwhm_series
            .iter()
            .chain(modeled.iter().map(|(_, y)| y))
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let mut chart = ChartBuilder::on(&plot)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .caption(
                format!("Best Focus: {} {:.3}", self.mode_name, self.best_focus),
                ("sans-serif", 16),
            )
            .build_cartesian_2d(
                x1 - xrange * 1e-2..x2 + xrange * 1e-2,
                y_min..y_max,
            )
            .unwrap();
        chart
            .configure_mesh()
            .x_desc("Focus Value")
            .y_desc(if self.mode_name.starts_with("IM_") {
                "FWHM"
            } else {
                "Mean FWHM"
            })
            .draw()
            .unwrap();

        let mut colors = colorous::TABLEAU10.iter().cycle();

        let color = colors.next().unwrap();
        let measured = RGBColor(color.r, color.g, color.b);
        chart
            .draw_series(
                self.focus_series
                    .iter()
                    .zip(&self.fwhm_series)
                    .map(|(&x, &y)| Cross::new((x, y), 5, measured.stroke_width(2))),
            )
            .unwrap()
            .label("Measured FWHM")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], measured));

        let color = colors.next().unwrap();
        let fitted = RGBColor(color.r, color.g, color.b);
        chart
            .draw_series(LineSeries::new(modeled, &fitted))
            .unwrap()
            .label("Model")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fitted));

        chart
            .draw_series(LineSeries::new(
                vec![(self.best_focus, y_min), (self.best_focus, y_max)],
                &BLACK,
            ))
            .unwrap()
            .label("Best Focus")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));

        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .unwrap();
    }
}
