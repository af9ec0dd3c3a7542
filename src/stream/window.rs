//! Bounded rolling windows, one per trace.

use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;

/// Most recent points of one trace, oldest first. `x.len() == y.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesWindow {
    pub x: VecDeque<Value>,
    pub y: VecDeque<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("window size must be at least 1")]
    ZeroWindow,

    #[error("trace index {index} out of range ({count} traces)")]
    UnknownTrace { index: usize, count: usize },

    #[error("trace index {0} appears more than once in one batch")]
    DuplicateTrace(usize),

    #[error("batch for {traces} traces carries {x} x and {y} y values")]
    Ragged { traces: usize, x: usize, y: usize },
}

impl SeriesWindow {
    pub fn seeded(x: impl IntoIterator<Item = Value>, y: impl IntoIterator<Item = Value>, window_size: usize) -> Self {
        let mut window = Self {
            x: x.into_iter().collect(),
            y: y.into_iter().collect(),
        };
        let len = window.x.len().min(window.y.len());
        window.x.truncate(len);
        window.y.truncate(len);
        window.trim(window_size);
        window
    }

    fn push(&mut self, x: Value, y: Value, window_size: usize) {
        self.x.push_back(x);
        self.y.push_back(y);
        self.trim(window_size);
    }

    fn trim(&mut self, window_size: usize) {
        while self.x.len() > window_size {
            self.x.pop_front();
            self.y.pop_front();
        }
    }
}

/// A window must hold at least one point.
pub fn check_window(window_size: usize) -> Result<(), StreamError> {
    if window_size == 0 {
        return Err(StreamError::ZeroWindow);
    }
    Ok(())
}

/// Append one point per listed trace: `x[k]`/`y[k]` go to trace
/// `trace_indices[k]`. Windows longer than `window_size` drop their oldest
/// points.
///
/// The whole batch is checked before any window is touched, so a rejected
/// batch leaves every window as it was.
pub fn append(
    windows: &mut [SeriesWindow],
    trace_indices: &[usize],
    x: &[Value],
    y: &[Value],
    window_size: usize,
) -> Result<(), StreamError> {
    check_window(window_size)?;
    if x.len() != trace_indices.len() || y.len() != trace_indices.len() {
        return Err(StreamError::Ragged {
            traces: trace_indices.len(),
            x: x.len(),
            y: y.len(),
        });
    }
    let mut seen = vec![false; windows.len()];
    for &index in trace_indices {
        match seen.get_mut(index) {
            None => {
                return Err(StreamError::UnknownTrace {
                    index,
                    count: windows.len(),
                });
            }
            Some(true) => return Err(StreamError::DuplicateTrace(index)),
            Some(flag) => *flag = true,
        }
    }

    for ((&index, xv), yv) in trace_indices.iter().zip(x).zip(y) {
        windows[index].push(xv.clone(), yv.clone(), window_size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn windows(n: usize) -> Vec<SeriesWindow> {
        vec![SeriesWindow::default(); n]
    }

    #[test]
    fn keeps_the_last_window_size_points_in_order() {
        let mut w = windows(1);
        for i in 0..25 {
            append(&mut w, &[0], &[json!(i)], &[json!(i * 10)], 20).unwrap();
            assert_eq!(w[0].x.len(), w[0].y.len());
            assert!(w[0].x.len() <= 20);
        }
        let xs: Vec<Value> = (5..25).map(|i| json!(i)).collect();
        let ys: Vec<Value> = (5..25).map(|i| json!(i * 10)).collect();
        assert_eq!(w[0].x, VecDeque::from(xs));
        assert_eq!(w[0].y, VecDeque::from(ys));
    }

    #[test]
    fn siblings_advance_together_when_only_some_evict() {
        let mut w = vec![
            SeriesWindow::seeded([json!("a"), json!("b"), json!("c")], [json!(1), json!(2), json!(3)], 3),
            SeriesWindow::seeded([json!("a")], [json!(1)], 3),
        ];
        append(&mut w, &[0, 1], &[json!("d"), json!("d")], &[json!(4), json!(4)], 3).unwrap();

        assert_eq!(w[0].x, VecDeque::from(vec![json!("b"), json!("c"), json!("d")]));
        assert_eq!(w[1].x, VecDeque::from(vec![json!("a"), json!("d")]));
        assert_eq!(w[1].y, VecDeque::from(vec![json!(1), json!(4)]));
    }

    #[test]
    fn bad_batches_leave_all_windows_untouched() {
        let mut w = windows(2);
        append(&mut w, &[0, 1], &[json!(0), json!(0)], &[json!(1), json!(1)], 5).unwrap();
        let before = w.clone();

        assert_eq!(
            append(&mut w, &[0, 2], &[json!(1), json!(1)], &[json!(2), json!(2)], 5),
            Err(StreamError::UnknownTrace { index: 2, count: 2 })
        );
        assert_eq!(
            append(&mut w, &[1, 1], &[json!(1), json!(1)], &[json!(2), json!(2)], 5),
            Err(StreamError::DuplicateTrace(1))
        );
        assert_eq!(
            append(&mut w, &[0, 1], &[json!(1)], &[json!(2), json!(2)], 5),
            Err(StreamError::Ragged { traces: 2, x: 1, y: 2 })
        );
        assert_eq!(
            append(&mut w, &[0], &[json!(1)], &[json!(2)], 0),
            Err(StreamError::ZeroWindow)
        );
        assert_eq!(w, before);
    }

    #[test]
    fn seeding_equalizes_and_trims() {
        let w = SeriesWindow::seeded([json!(1), json!(2), json!(3)], [json!(0), json!(0)], 1);
        assert_eq!(w.x, VecDeque::from(vec![json!(2)]));
        assert_eq!(w.y, VecDeque::from(vec![json!(0)]));
    }
}
