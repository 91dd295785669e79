//! Pool-based price composition
//!
//! Direct pools price a pair outright; otherwise the price is composed
//! through the designated intermediary. When several pools qualify for
//! a leg, the leg price is a liquidity-weighted average with the pay
//! side's reserve as the weight.

use tracing::debug;

use crate::ledger::PoolInfo;

/// Price of one leg plus the fee and pool data backing it
#[derive(Debug, Clone, PartialEq)]
pub struct LegPrice {
    pub price: f64,
    /// Highest LP fee among contributing pools, in basis points
    pub lp_fee_bps: u32,
    pub pool_count: usize,
    /// Combined pay-side reserve of contributing pools
    pub pay_side_liquidity: f64,
}

/// Liquidity-weighted average price for a single pair across all
/// qualifying pools: Σ(price·weight) / Σ(weight)
pub fn leg_price(pools: &[PoolInfo], pay: &str, receive: &str) -> Option<LegPrice> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut lp_fee_bps = 0u32;
    let mut pool_count = 0usize;

    for pool in pools.iter().filter(|p| p.trades(pay, receive)) {
        let (Some(price), Some(weight)) = (pool.mid_price(pay), pool.reserve_of(pay)) else {
            continue;
        };
        if weight <= 0.0 {
            continue;
        }
        weighted_sum += price * weight;
        weight_sum += weight;
        lp_fee_bps = lp_fee_bps.max(pool.lp_fee_bps);
        pool_count += 1;
    }

    if pool_count == 0 || weight_sum <= 0.0 {
        return None;
    }

    Some(LegPrice {
        price: weighted_sum / weight_sum,
        lp_fee_bps,
        pool_count,
        pay_side_liquidity: weight_sum,
    })
}

/// A priced route: direct, or composed through the intermediary
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRoute {
    pub legs: Vec<(String, String, LegPrice)>,
    pub price: f64,
}

pub fn price_route(
    pools: &[PoolInfo],
    pay: &str,
    receive: &str,
    intermediary: &str,
) -> Option<PricedRoute> {
    if let Some(direct) = leg_price(pools, pay, receive) {
        let price = direct.price;
        return Some(PricedRoute {
            legs: vec![(pay.to_string(), receive.to_string(), direct)],
            price,
        });
    }

    // Two-hop fallback: pay -> intermediary -> receive
    let first = leg_price(pools, pay, intermediary)?;
    let second = leg_price(pools, intermediary, receive)?;
    let price = first.price * second.price;
    debug!(
        "Routing {} -> {} through {}: {} * {} = {}",
        pay, receive, intermediary, first.price, second.price, price
    );
    Some(PricedRoute {
        legs: vec![
            (pay.to_string(), intermediary.to_string(), first),
            (intermediary.to_string(), receive.to_string(), second),
        ],
        price,
    })
}

/// Simple impact estimate: the pay amount's share of post-trade pay-side
/// liquidity on the thinnest leg, in percent
pub fn price_impact_pct(route: &PricedRoute, pay_amount: f64) -> f64 {
    if pay_amount <= 0.0 {
        return 0.0;
    }
    route
        .legs
        .iter()
        .map(|(_, _, leg)| {
            let reserve = leg.pay_side_liquidity;
            if reserve <= 0.0 {
                100.0
            } else {
                pay_amount / (reserve + pay_amount) * 100.0
            }
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(base: &str, quote: &str, base_reserve: f64, quote_reserve: f64) -> PoolInfo {
        PoolInfo {
            base: base.to_string(),
            quote: quote.to_string(),
            base_reserve,
            quote_reserve,
            lp_fee_bps: 30,
        }
    }

    #[test]
    fn direct_pool_prices_the_pair() {
        let pools = vec![pool("SOL", "ICP", 100.0, 2_000.0)];
        let route = price_route(&pools, "SOL", "ICP", "ICP").unwrap();
        assert_eq!(route.legs.len(), 1);
        assert!((route.price - 20.0).abs() < 1e-9);

        // Inverted when paying with the quote side
        let route = price_route(&pools, "ICP", "SOL", "ICP").unwrap();
        assert!((route.price - 0.05).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_across_parallel_pools() {
        // Pool A: price 20, pay-side reserve 100. Pool B: price 10,
        // pay-side reserve 300. Weighted: (20*100 + 10*300) / 400 = 12.5
        let pools = vec![
            pool("SOL", "ICP", 100.0, 2_000.0),
            pool("SOL", "ICP", 300.0, 3_000.0),
        ];
        let leg = leg_price(&pools, "SOL", "ICP").unwrap();
        assert!((leg.price - 12.5).abs() < 1e-9);
        assert_eq!(leg.pool_count, 2);
    }

    #[test]
    fn two_hop_composes_through_intermediary() {
        let pools = vec![
            pool("SOL", "ICP", 100.0, 2_000.0),   // SOL -> ICP = 20
            pool("ICP", "USDT", 1_000.0, 8_000.0), // ICP -> USDT = 8
        ];
        let route = price_route(&pools, "SOL", "USDT", "ICP").unwrap();
        assert_eq!(route.legs.len(), 2);
        assert!((route.price - 160.0).abs() < 1e-9);
    }

    #[test]
    fn missing_route_yields_none() {
        let pools = vec![pool("SOL", "ICP", 100.0, 2_000.0)];
        assert!(price_route(&pools, "SOL", "BTC", "ICP").is_none());
    }

    #[test]
    fn impact_grows_with_trade_size() {
        let pools = vec![pool("SOL", "ICP", 100.0, 2_000.0)];
        let route = price_route(&pools, "SOL", "ICP", "ICP").unwrap();

        let small = price_impact_pct(&route, 1.0);
        let large = price_impact_pct(&route, 100.0);
        assert!(small < large);
        assert!((large - 50.0).abs() < 1e-9);
    }
}
