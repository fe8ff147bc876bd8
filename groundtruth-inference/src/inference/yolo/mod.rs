use inference_yolo_seg::YoloSegmentDetection;

pub mod inference_yolo_seg;

pub trait NMSImplement {
    fn non_maximum_suppression(self, iou_threshold: f32) -> Vec<YoloSegmentDetection>;
}

impl NMSImplement for Vec<YoloSegmentDetection> {
    /// Greedy per-class suppression. Survivors come out by descending score.
    fn non_maximum_suppression(self, iou_threshold: f32) -> Vec<YoloSegmentDetection> {
        let mut candidates = self;
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut result: Vec<YoloSegmentDetection> = Vec::new();

        while !candidates.is_empty() {
            let best = candidates.remove(0);

            candidates.retain(|d| {
                d.classify != best.classify || best.boxed.iou(&d.boxed) < iou_threshold
            });
            result.push(best);
        }

        result
    }
}
