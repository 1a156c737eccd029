//! NaN-aware reductions over sample windows. Sensor dropouts arrive as NaN and
//! must never win a max/min or poison a mean.
use ndarray::{s, ArrayView1};
/// `data[from..to]`, clamped to the data length instead of panicking.
pub fn window(data: ArrayView1<'_, f64>, from: usize, to: usize) -> ArrayView1<'_, f64> {
    let to = to.min(data.len());
    let from = from.min(to);
    data.slice_move(s![from..to])
}
/// Inclusive `data[from..=to]`, clamped.
pub fn window_inclusive(data: ArrayView1<'_, f64>, from: usize, to: usize) -> ArrayView1<'_, f64> {
    window(data, from, to.saturating_add(1))
}
/// Largest non-NaN value, NaN if there is none.
pub fn nan_max<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(f64::NAN)
}
/// Smallest non-NaN value, NaN if there is none.
pub fn nan_min<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
        .unwrap_or(f64::NAN)
}
/// Mean of the non-NaN values, NaN if there is none.
pub fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
