use crate::detection::{Detection, Rect};

pub fn intersection_area(a: &Rect, b: &Rect) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = a.right().min(b.right());
    let y1 = a.bottom().min(b.bottom());
    if x1 <= x0 || y1 <= y0 {
        return 0.0;
    }
    (x1 - x0) * (y1 - y0)
}

/// Intersection over union; zero when the union is empty.
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let inter = intersection_area(a, b);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

/// Sort by confidence, highest first.
pub fn sort_by_confidence(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Greedy suppression over detections already sorted by confidence.
///
/// Returns the indices of kept detections in input order.
pub fn nms_sorted(detections: &[Detection], iou_threshold: f32) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::new();
    for (i, candidate) in detections.iter().enumerate() {
        let keep = picked
            .iter()
            .all(|&j| iou(&candidate.rect, &detections[j].rect) <= iou_threshold);
        if keep {
            picked.push(i);
        }
    }
    picked
}

/// Sort then suppress, returning the surviving detections highest confidence first.
pub fn rank_and_suppress(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    sort_by_confidence(&mut detections);
    nms_sorted(&detections, iou_threshold)
        .into_iter()
        .map(|i| detections[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Detection {
        Detection {
            rect: Rect::new(x, y, w, h),
            label: 0,
            confidence,
        }
    }

    #[test]
    fn identical_boxes_have_unit_iou() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(iou(&a, &a), 1.0);
    }

    #[test]
    fn disjoint_boxes_have_zero_iou() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(5.0, 5.0, 1.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn zero_area_boxes_have_zero_iou() {
        let a = Rect::new(3.0, 3.0, 0.0, 0.0);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn heavy_overlap_keeps_only_the_stronger_box() {
        let detections = vec![
            detection(1.0, 0.0, 10.0, 10.0, 0.6),
            detection(0.0, 0.0, 10.0, 10.0, 0.9),
        ];

        let kept = rank_and_suppress(detections, 0.5);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn light_overlap_keeps_both_boxes() {
        let detections = vec![
            detection(0.0, 0.0, 10.0, 10.0, 0.9),
            detection(9.0, 0.0, 10.0, 10.0, 0.8),
        ];

        let kept = rank_and_suppress(detections, 0.5);

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn output_is_ordered_by_confidence() {
        let detections = vec![
            detection(0.0, 0.0, 5.0, 5.0, 0.3),
            detection(20.0, 0.0, 5.0, 5.0, 0.7),
            detection(40.0, 0.0, 5.0, 5.0, 0.5),
        ];

        let kept = rank_and_suppress(detections, 0.5);

        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.7, 0.5, 0.3]);
    }

    #[test]
    fn suppression_is_idempotent() {
        let detections = vec![
            detection(0.0, 0.0, 10.0, 10.0, 0.9),
            detection(1.0, 1.0, 10.0, 10.0, 0.85),
            detection(30.0, 30.0, 10.0, 10.0, 0.8),
            detection(32.0, 30.0, 10.0, 10.0, 0.75),
            detection(60.0, 0.0, 8.0, 8.0, 0.5),
        ];

        let once = rank_and_suppress(detections, 0.5);
        let twice = rank_and_suppress(once.clone(), 0.5);

        assert_eq!(once, twice);
    }

    #[test]
    fn picked_indices_refer_to_sorted_input() {
        let mut detections = vec![
            detection(0.0, 0.0, 10.0, 10.0, 0.4),
            detection(0.5, 0.5, 10.0, 10.0, 0.95),
        ];
        sort_by_confidence(&mut detections);

        let picked = nms_sorted(&detections, 0.5);

        assert_eq!(picked, vec![0]);
        assert_eq!(detections[picked[0]].confidence, 0.95);
    }
}
