//! Property tests for the perceptual pixel diff.

use pixreview_core::diff::{diff, diff_count, DiffError, DiffOptions};
use proptest::prelude::*;

fn rgba_buffer() -> impl Strategy<Value = (u32, u32, Vec<u8>)> {
    (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
        let len = (w * h * 4) as usize;
        (Just(w), Just(h), prop::collection::vec(any::<u8>(), len))
    })
}

fn buffer_pair() -> impl Strategy<Value = (u32, u32, Vec<u8>, Vec<u8>)> {
    (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
        let len = (w * h * 4) as usize;
        (
            Just(w),
            Just(h),
            prop::collection::vec(any::<u8>(), len),
            prop::collection::vec(any::<u8>(), len),
        )
    })
}

proptest! {
    #[test]
    fn identical_buffers_never_differ((w, h, buf) in rgba_buffer()) {
        let opts = DiffOptions::review();
        prop_assert_eq!(diff_count(&buf, &buf, w, h, &opts).unwrap(), 0);
    }

    #[test]
    fn count_is_symmetric((w, h, a, b) in buffer_pair()) {
        for opts in [DiffOptions::default(), DiffOptions::review()] {
            let ab = diff_count(&a, &b, w, h, &opts).unwrap();
            let ba = diff_count(&b, &a, w, h, &opts).unwrap();
            prop_assert_eq!(ab, ba);
        }
    }

    #[test]
    fn count_bounded_by_pixels((w, h, a, b) in buffer_pair()) {
        let result = diff(&a, &b, w, h, &DiffOptions::review()).unwrap();
        prop_assert!(result.mismatch_count <= (w * h) as usize);
        prop_assert_eq!(result.raster.len(), a.len());
    }

    #[test]
    fn wrong_length_is_rejected((w, h, buf) in rgba_buffer(), extra in 1usize..8) {
        let mut longer = buf.clone();
        longer.extend(std::iter::repeat_n(0u8, extra));
        let err = diff_count(&buf, &longer, w, h, &DiffOptions::default()).unwrap_err();
        let is_size_mismatch = matches!(err, DiffError::SizeMismatch { .. });
        prop_assert!(is_size_mismatch);
    }
}
