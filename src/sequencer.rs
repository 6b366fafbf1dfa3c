// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Randomized pose ordering for a session.

use rand::Rng;

use crate::verbose;

/// Produce a uniformly random permutation of pose ids `1..=total`.
///
/// Fisher–Yates: walk from the last index down to 1 and swap each element with one chosen
/// uniformly from `[0, i]`.
///
/// # Arguments
///
/// * `total` - Number of poses.
/// * `rng` - Random source; seed a `StdRng` for reproducible orders.
#[must_use]
pub fn shuffle_order<R: Rng + ?Sized>(total: usize, rng: &mut R) -> Vec<u32> {
    let upper = u32::try_from(total).unwrap_or(u32::MAX);
    let mut order: Vec<u32> = (1..=upper).collect();
    for i in (1..order.len()).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }
    verbose!("Pose order: {order:?}");
    order
}

/// Check that `order` is a permutation of `1..=total`.
#[must_use]
pub fn is_permutation(order: &[u32], total: usize) -> bool {
    if order.len() != total {
        return false;
    }
    let mut seen = vec![false; total];
    order.iter().all(|&id| {
        let Some(slot) = (id as usize).checked_sub(1).and_then(|i| seen.get_mut(i)) else {
            return false;
        };
        !std::mem::replace(slot, true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_permutation_property() {
        let mut rng = StdRng::seed_from_u64(7);
        for total in 0..20 {
            for _ in 0..25 {
                let order = shuffle_order(total, &mut rng);
                assert!(is_permutation(&order, total), "{order:?} for n={total}");
            }
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = shuffle_order(7, &mut StdRng::seed_from_u64(42));
        let b = shuffle_order(7, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_position_reachable() {
        // With 3 poses every id should land first at least once over many shuffles.
        let mut rng = StdRng::seed_from_u64(1);
        let mut firsts = [0_usize; 3];
        for _ in 0..600 {
            let order = shuffle_order(3, &mut rng);
            firsts[order[0] as usize - 1] += 1;
        }
        assert!(firsts.iter().all(|&n| n > 100), "{firsts:?}");
    }

    #[test]
    fn test_is_permutation_rejects() {
        assert!(is_permutation(&[2, 1, 3], 3));
        assert!(!is_permutation(&[1, 1, 3], 3));
        assert!(!is_permutation(&[1, 2], 3));
        assert!(!is_permutation(&[0, 1, 2], 3));
        assert!(!is_permutation(&[1, 2, 4], 3));
    }
}
