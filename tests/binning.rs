use livespectrum::data::histogram::{aggregate, si_format, BinningParams, Rate};
use livespectrum::data::render::RenderPipeline;
use livespectrum::{Histogram, ViewportSize};

fn counts(len: usize) -> Vec<u64> {
    (0..len as u64).map(|i| (i * 7 + 3) % 11).collect()
}

#[test]
fn aggregation_conserves_counts_above_threshold() {
    let hist = counts(100);
    for bin_size in [1, 2, 3, 4, 7, 10, 64, 100, 150] {
        for threshold in [-1, 0, 3, 10, 50, 99, 200] {
            let params = BinningParams::new(bin_size, threshold).unwrap();
            let binned = aggregate(&hist, &params);
            assert_eq!(binned.len(), hist.len() / bin_size);

            // channels that fall into a whole bin and lie above the threshold
            let covered = binned.len() * bin_size;
            let expected: u64 = hist
                .iter()
                .enumerate()
                .filter(|&(i, _)| (i as i64) > threshold && i < covered)
                .map(|(_, &c)| c)
                .sum();
            assert_eq!(
                binned.iter().sum::<u64>(),
                expected,
                "bin_size={bin_size} threshold={threshold}"
            );
        }
    }
}

#[test]
fn documented_binning_scenario() {
    let params = BinningParams::new(2, 3).unwrap();
    let binned = aggregate(&[0, 0, 0, 0, 0, 2, 0, 1], &params);
    assert_eq!(binned, vec![0, 0, 2, 1]);
    assert_eq!(binned.iter().sum::<u64>(), 3);
}

#[test]
fn trailing_channels_are_dropped_from_the_view_only() {
    let hist = Histogram::from_counts(vec![1; 10]);
    let params = BinningParams::new(4, -1).unwrap();
    assert_eq!(aggregate(hist.counts(), &params), vec![4, 4]);
    assert_eq!(hist.total(), 10);
}

#[test]
fn rate_labels_never_show_non_finite_values() {
    assert_eq!(Rate::from_counts(120, 60.0).to_string(), "120.00 CPM");
    for elapsed in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        assert_eq!(Rate::from_counts(10, elapsed).to_string(), "--- CPM");
    }
}

#[test]
fn tick_labels_use_metric_prefixes() {
    assert_eq!(si_format(950.0), "950");
    assert_eq!(si_format(1500.0), "1.5k");
    assert_eq!(si_format(2_500_000.0), "2.5M");

    let mut pipeline = RenderPipeline::new(BinningParams::new(1, -1).unwrap());
    let hist = Histogram::from_counts(vec![0, 20_000, 5_000, 0]);
    let frame = pipeline.render(&hist, 10.0, &ViewportSize::new(400.0, 300.0));
    let labels: Vec<&str> = frame.y_ticks.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(labels[0], "");
    assert_eq!(labels[1], "2.0k");
    assert_eq!(labels[9], "18.0k");
}
