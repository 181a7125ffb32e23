use super::{config::TimeDomain, sample::Sample};
/// What a window has to do with one batch.
#[derive(Clone, Debug, PartialEq)]
pub enum SweepPlan {
    /// No wrap: everything continues the current sweep.
    Append(Vec<Sample>),
    /// Exactly one wrap: `current` finishes the active sweep, `next` starts the new one.
    Wrap {
        current: Vec<Sample>,
        next: Vec<Sample>,
    },
    /// More than one full sweep arrived at once. The batch is dropped.
    Overflow { wraps: usize },
}
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedBatch {
    pub wraps: usize,
    /// Wrapped x of the final sample; becomes the window's head.
    pub head: f64,
    pub plan: SweepPlan,
}
/// Wraps every sample onto the domain and counts wraps relative to `head`.
///
/// The reference starts at the pre-batch head and then follows the previous
/// sample. A wrap is counted on each edge where a sample falls below the
/// reference after one that did not, so a run of low samples counts once.
/// Returns `None` for an empty batch.
pub fn classify(head: f64, domain: TimeDomain, batch: &[Sample]) -> Option<ClassifiedBatch> {
    let last = batch.last()?;
    let wrapped: Vec<Sample> = batch
        .iter()
        .map(|s| Sample::new(domain.wrap(s.x), s.y))
        .collect();
    let new_head = domain.wrap(last.x);
    let wraps = count_wraps(head, &wrapped);
    let plan = match wraps {
        0 => SweepPlan::Append(wrapped),
        1 => {
            let (current, next): (Vec<Sample>, Vec<Sample>) =
                wrapped.into_iter().partition(|s| s.x > head);
            SweepPlan::Wrap { current, next }
        }
        wraps => SweepPlan::Overflow { wraps },
    };
    Some(ClassifiedBatch {
        wraps,
        head: new_head,
        plan,
    })
}
fn count_wraps(head: f64, wrapped: &[Sample]) -> usize {
    let mut reference = head;
    let mut below_prev = false;
    let mut wraps = 0;
    for s in wrapped {
        let below = s.x < reference;
        if below && !below_prev {
            wraps += 1;
        }
        below_prev = below;
        reference = s.x;
    }
    wraps
}
#[cfg(test)]
mod tests {
    use super::*;
    fn batch(xs: &[f64]) -> Vec<Sample> {
        xs.iter().map(|&x| Sample::new(x, x / 10.0)).collect()
    }
    fn xs(samples: &[Sample]) -> Vec<f64> {
        samples.iter().map(|s| s.x).collect()
    }
    fn domain() -> TimeDomain {
        TimeDomain::new(5000.0).unwrap()
    }
    #[test]
    fn empty_batch_is_not_classified() {
        assert!(classify(1234.0, domain(), &[]).is_none());
    }
    #[test]
    fn monotonic_batch_appends() {
        let out = classify(100.0, domain(), &batch(&[200.0, 300.0, 400.0])).unwrap();
        assert_eq!(out.wraps, 0);
        assert_eq!(out.head, 400.0);
        match out.plan {
            SweepPlan::Append(samples) => assert_eq!(xs(&samples), vec![200.0, 300.0, 400.0]),
            other => panic!("unexpected plan {other:?}"),
        }
    }
    #[test]
    fn raw_timestamps_are_wrapped() {
        let out = classify(4800.0, domain(), &batch(&[9850.0, 9950.0, 10_050.0, 10_150.0])).unwrap();
        assert_eq!(out.wraps, 1);
        assert_eq!(out.head, 150.0);
        match out.plan {
            SweepPlan::Wrap { current, next } => {
                assert_eq!(xs(&current), vec![4850.0, 4950.0]);
                assert_eq!(xs(&next), vec![50.0, 150.0]);
                // y survives wrapping untouched
                assert_eq!(current[0].y, 985.0);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }
    #[test]
    fn two_backward_jumps_overflow() {
        let out = classify(0.0, domain(), &batch(&[100.0, 4990.0, 50.0, 4990.0, 50.0])).unwrap();
        assert!(out.wraps >= 2);
        assert_eq!(out.head, 50.0);
        assert!(matches!(out.plan, SweepPlan::Overflow { .. }));
    }
    #[test]
    fn held_low_run_counts_once() {
        // Falls below the head once, then keeps a decreasing run.
        let out = classify(3000.0, domain(), &batch(&[3100.0, 40.0, 30.0, 20.0])).unwrap();
        assert_eq!(out.wraps, 1);
    }
    #[test]
    fn first_sample_below_head_counts_as_wrap() {
        let out = classify(4900.0, domain(), &batch(&[10.0, 20.0])).unwrap();
        assert_eq!(out.wraps, 1);
        match out.plan {
            SweepPlan::Wrap { current, next } => {
                assert!(current.is_empty());
                assert_eq!(xs(&next), vec![10.0, 20.0]);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }
    #[test]
    fn sample_equal_to_head_is_not_a_wrap() {
        let out = classify(250.0, domain(), &batch(&[250.0, 260.0])).unwrap();
        assert_eq!(out.wraps, 0);
    }
}
