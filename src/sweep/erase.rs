use super::{config::TimeDomain, sample::Rect};
/// Lead of the occluder's trailing edge past the head, as a fraction of the domain.
pub const ERASE_LEAD_FRACTION: f64 = 0.03;
/// Region hiding the previous sweep between the left edge and just past the head.
pub fn occluder_bounds(head: f64, domain: TimeDomain, y_min: f64, y_max: f64) -> Rect {
    Rect {
        x1: 0.0,
        y1: y_min,
        x2: head + domain.width() * ERASE_LEAD_FRACTION,
        y2: y_max,
    }
}
