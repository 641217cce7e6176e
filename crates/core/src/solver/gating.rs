//! Stochastic IP3 receptor gating
//!
//! Each cluster site holds `n` channels of which `k` are open. Per step the
//! open and close probabilities are saturating Hill-type functions of the
//! local calcium and IP3:
//! ```text
//! p_open  = open_rate  · ĉ² · IP3² / ((ĉ + 0.3)³ · (IP3 + 0.2)²)
//! p_close = close_rate · ĉ / (ĉ + 0.3)          with ĉ = min(Ca, 1000)
//! ```
//! Opening is sampled against the `n − k` closed channels and closing
//! against the `k` open ones, independently, then the result is clamped to
//! `[0, n]`. This is a per-step Bernoulli approximation of the underlying
//! birth-death process and is only faithful while `rate · dt ≪ 1`.

use super::fields::ChannelField;
use rand::Rng;
use rand_distr::{Binomial, Distribution};

/// Calcium cap applied inside the gating functions only
pub const GATING_CALCIUM_CAP: f64 = 1000.0;

/// Calcium half-activation offset of the gating functions
const CA_OFFSET: f64 = 0.3;

/// IP3 half-activation offset of the opening function
const IP3_OFFSET: f64 = 0.2;

/// How channel transitions are sampled at a cluster site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatingMode {
    /// One Bernoulli draw per site and direction with probability
    /// `p × available`; at most one channel opens and one closes per step
    #[default]
    Lumped,
    /// Every available channel transitions independently with
    /// probability `min(p, 1)` (binomial draw)
    PerChannel,
}

/// Gating rate constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatingRates {
    /// Opening rate constant
    pub open_rate: f64,
    /// Closing rate constant
    pub close_rate: f64,
}

/// Channel transitions during one gating step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatingSummary {
    /// Channels that opened
    pub opened: u64,
    /// Channels that closed
    pub closed: u64,
}

/// Per-channel opening probability
#[inline]
#[must_use]
pub fn open_probability(calcium: f64, ip3: f64, open_rate: f64) -> f64 {
    let ca = calcium.min(GATING_CALCIUM_CAP);
    let ca_term = ca + CA_OFFSET;
    let ip3_term = ip3 + IP3_OFFSET;
    open_rate * ca * ca * ip3 * ip3 / (ca_term * ca_term * ca_term * ip3_term * ip3_term)
}

/// Per-channel closing probability
#[inline]
#[must_use]
pub fn close_probability(calcium: f64, close_rate: f64) -> f64 {
    let ca = calcium.min(GATING_CALCIUM_CAP);
    close_rate * ca / (ca + CA_OFFSET)
}

/// Advance the open-channel counts by one step
///
/// Reads calcium and IP3 as they stood at the end of the previous step and
/// writes only `open`. Sites without channels draw nothing; the others are
/// visited in row-major order with the opening draw before the closing draw.
pub fn step_gating<R: Rng + ?Sized>(
    open: &mut ChannelField,
    clusters: &ChannelField,
    calcium: &[f64],
    ip3: &[f64],
    rates: GatingRates,
    mode: GatingMode,
    rng: &mut R,
) -> GatingSummary {
    let mut summary = GatingSummary::default();

    for (idx, (open_count, &cluster_count)) in
        open.data.iter_mut().zip(&clusters.data).enumerate()
    {
        if cluster_count == 0 {
            *open_count = 0;
            continue;
        }

        let current = (*open_count).min(cluster_count);
        let closed_channels = cluster_count - current;
        let p_open = open_probability(calcium[idx], ip3[idx], rates.open_rate);
        let p_close = close_probability(calcium[idx], rates.close_rate);

        let (opening, closing) = match mode {
            GatingMode::Lumped => {
                let opening = rng.random::<f64>() < p_open * f64::from(closed_channels);
                let closing = rng.random::<f64>() < p_close * f64::from(current);
                (u32::from(opening), u32::from(closing))
            }
            GatingMode::PerChannel => (
                binomial_draw(closed_channels, p_open, rng),
                binomial_draw(current, p_close, rng),
            ),
        };

        summary.opened += u64::from(opening);
        summary.closed += u64::from(closing);

        let next = i64::from(current) + i64::from(opening) - i64::from(closing);
        *open_count = next.clamp(0, i64::from(cluster_count)) as u32;
    }

    summary
}

fn binomial_draw<R: Rng + ?Sized>(trials: u32, p: f64, rng: &mut R) -> u32 {
    if trials == 0 {
        return 0;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    Binomial::new(u64::from(trials), p)
        .map_or(0, |b| b.sample(rng).min(u64::from(trials)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const RATES: GatingRates = GatingRates {
        open_rate: 0.01,
        close_rate: 10.0,
    };

    #[test]
    fn test_probabilities_need_calcium_and_ip3() {
        assert_eq!(open_probability(0.0, 1.0, 1.0), 0.0);
        assert_eq!(open_probability(1.0, 0.0, 1.0), 0.0);
        assert!(open_probability(1.0, 1.0, 1.0) > 0.0);
        assert_eq!(close_probability(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_calcium_cap_inside_gating() {
        assert_eq!(
            open_probability(5000.0, 2.0, 1.0),
            open_probability(GATING_CALCIUM_CAP, 2.0, 1.0)
        );
        assert_eq!(
            close_probability(1e9, 10.0),
            close_probability(GATING_CALCIUM_CAP, 10.0)
        );
    }

    #[test]
    fn test_close_probability_saturates() {
        // ĉ/(ĉ+0.3) → 1, so p_close → close_rate
        let p = close_probability(1000.0, 10.0);
        assert!(p < 10.0 && p > 9.99);
    }

    fn single_site(clusters: u32, open_now: u32) -> (ChannelField, ChannelField) {
        let mut cluster_map = ChannelField::new(3);
        cluster_map.set(1, 1, clusters);
        let mut open = ChannelField::new(3);
        open.set(1, 1, open_now);
        (open, cluster_map)
    }

    #[test]
    fn test_no_ip3_no_opening() {
        let (mut open, clusters) = single_site(10, 0);
        let calcium = vec![0.1; 9];
        let ip3 = vec![0.0; 9];
        let mut rng = StdRng::seed_from_u64(1);
        for mode in [GatingMode::Lumped, GatingMode::PerChannel] {
            for _ in 0..100 {
                step_gating(&mut open, &clusters, &calcium, &ip3, RATES, mode, &mut rng);
                assert_eq!(open.get(1, 1), 0);
            }
        }
    }

    #[test]
    fn test_open_count_stays_within_cluster() {
        let (mut open, clusters) = single_site(6, 3);
        let calcium = vec![2.0; 9];
        let ip3 = vec![10.0; 9];
        let rates = GatingRates {
            open_rate: 5.0,
            close_rate: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(9);
        for mode in [GatingMode::Lumped, GatingMode::PerChannel] {
            for _ in 0..500 {
                step_gating(&mut open, &clusters, &calcium, &ip3, rates, mode, &mut rng);
                assert!(open.get(1, 1) <= 6);
            }
        }
    }

    #[test]
    fn test_lumped_moves_at_most_one_each_way() {
        let (mut open, clusters) = single_site(20, 10);
        let calcium = vec![1.0; 9];
        let ip3 = vec![5.0; 9];
        let rates = GatingRates {
            open_rate: 10.0,
            close_rate: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(2);
        let summary = step_gating(
            &mut open,
            &clusters,
            &calcium,
            &ip3,
            rates,
            GatingMode::Lumped,
            &mut rng,
        );
        // p_open × closed ≫ 1, so exactly one channel opens
        assert_eq!(summary.opened, 1);
        assert_eq!(summary.closed, 0);
        assert_eq!(open.get(1, 1), 11);
    }

    #[test]
    fn test_per_channel_saturated_close() {
        let (mut open, clusters) = single_site(8, 8);
        let calcium = vec![1000.0; 9];
        let ip3 = vec![0.0; 9];
        let mut rng = StdRng::seed_from_u64(4);
        // p_close ≈ 10 clamps to 1: every open channel closes
        step_gating(
            &mut open,
            &clusters,
            &calcium,
            &ip3,
            RATES,
            GatingMode::PerChannel,
            &mut rng,
        );
        assert_eq!(open.get(1, 1), 0);
    }

    #[test]
    fn test_sites_without_channels_stay_closed() {
        let mut open = ChannelField::new(3);
        open.set(0, 0, 4);
        let clusters = ChannelField::new(3);
        let mut rng = StdRng::seed_from_u64(0);
        let summary = step_gating(
            &mut open,
            &clusters,
            &[1.0; 9],
            &[1.0; 9],
            RATES,
            GatingMode::Lumped,
            &mut rng,
        );
        assert_eq!(open.total(), 0);
        assert_eq!(summary, GatingSummary::default());
    }
}
