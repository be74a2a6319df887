//! Protocol Metrics
//!
//! Read-only figures derived from one reserve and oracle snapshot. Percentages
//! are integers in nano-percent (`100% == 100 * NANO`).

use crate::{
    boxes::{OracleBox, ReserveBox, Token},
    error::{DomainError, ReactorError},
    fees::token_value,
    math::{checked_sum, mul_div, mul_div_wide, NANO},
    pricing,
    volume::Direction,
};

/// One hundred percent in nano-percent.
pub const HUNDRED_PERCENT: u64 = 100 * NANO;

/// Reserve ratio at which the fusion ratio reaches its ceiling, `100 / 0.66`
/// percent, in nano-percent.
///
/// Hand-derived from the fusion ratio ceiling; awaiting confirmation of the
/// exact rounding from the protocol designers.
pub const CUSHION_FLOOR: u64 = 151_515_151_515;

/// Volume windows reported by [`ProtocolStats`], in epochs.
pub const VOLUME_WINDOWS: [usize; 3] = [1, 7, 14];

/// Accumulated transmutation volume over one window, in nanoERG.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VolumeSummary {
    pub epochs: usize,
    pub to_stable: u64,
    pub to_volatile: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolStats {
    pub prices: pricing::PriceSnapshot,
    /// nanoERG per gram of gold
    pub gold_price: u64,
    pub tvl: u64,
    pub normalized_reserve_ratio: u64,
    pub reserve_ratio: u64,
    pub price_crash_cushion: u64,
    pub volumes: Vec<VolumeSummary>,
}

fn circulating_value(reserve: &ReserveBox, oracle: &OracleBox, token: Token) -> Result<u64, ReactorError> {
    token_value(reserve, oracle, token, reserve.circulating_supply(token))
}

/// Total value locked: market value of both circulating supplies in nanoERG.
pub fn tvl(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    Ok(checked_sum([
        circulating_value(reserve, oracle, Token::Stable)?,
        circulating_value(reserve, oracle, Token::Volatile)?,
    ])?)
}

/// `100 * (volatile value + stable value) / stable value`, the inverse of the
/// stable token's share of the reserve.
pub fn normalized_reserve_ratio(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    let stable = circulating_value(reserve, oracle, Token::Stable)?;
    let total = tvl(reserve, oracle)?;
    Ok(mul_div(total, HUNDRED_PERCENT, stable)?)
}

/// TVL relative to the gold value of the circulating stable tokens.
pub fn reserve_ratio(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    let circ = reserve.circulating_supply(Token::Stable);
    if circ == 0 {
        return Err(DomainError::ZeroCirculatingSupply(Token::Stable.name()).into());
    }
    let price_per_kg = oracle.price_per_kg();
    if price_per_kg == 0 {
        return Err(DomainError::ZeroOraclePrice.into());
    }
    // tvl / (circ / 1e9 * price_per_kg / 1e3), in percent
    Ok(mul_div_wide(
        &[tvl(reserve, oracle)?, 100_000_000_000_000, NANO],
        &[circ, price_per_kg],
    )?)
}

/// Largest drop of the reserve asset against gold the stable peg survives,
/// as a percentage of the current price. Zero once the fusion ratio is at
/// its ceiling.
pub fn price_crash_cushion(reserve_ratio: u64) -> Result<u64, ReactorError> {
    if reserve_ratio <= CUSHION_FLOOR {
        return Ok(0);
    }
    Ok(mul_div(
        reserve_ratio - CUSHION_FLOOR,
        HUNDRED_PERCENT,
        reserve_ratio,
    )?)
}

/// Volume in both directions over the `epochs` most recent epochs.
pub fn volume_summary(reserve: &ReserveBox, epochs: usize) -> Result<VolumeSummary, ReactorError> {
    Ok(VolumeSummary {
        epochs,
        to_stable: reserve.accumulate_volume(Direction::ToStable, epochs)?,
        to_volatile: reserve.accumulate_volume(Direction::ToVolatile, epochs)?,
    })
}

/// All metrics for the dashboard, at one snapshot.
pub fn protocol_stats(reserve: &ReserveBox, oracle: &OracleBox) -> Result<ProtocolStats, ReactorError> {
    let reserve_ratio = reserve_ratio(reserve, oracle)?;
    let volumes = VOLUME_WINDOWS
        .iter()
        .filter(|epochs| **epochs <= reserve.bucket_len())
        .map(|epochs| volume_summary(reserve, *epochs))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProtocolStats {
        prices: pricing::snapshot(reserve, oracle)?,
        gold_price: oracle.price_per_unit(),
        tvl: tvl(reserve, oracle)?,
        normalized_reserve_ratio: normalized_reserve_ratio(reserve, oracle)?,
        reserve_ratio,
        price_crash_cushion: price_crash_cushion(reserve_ratio)?,
        volumes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boxes::{
            tests::{oracle_raw, reserve_raw},
            RegisterValue,
        },
        config::tests::test_config,
        registers::{encode_long_array, RegisterId},
    };
    use assert_matches::assert_matches;

    const TOTAL: u64 = 1_000_000_000_000_000;

    /// 100 ERG reserve, 50 stable and 20 volatile in circulation.
    fn reserve_with(volume_to_stable: Option<Vec<u64>>) -> ReserveBox {
        let config = test_config();
        let mut raw = reserve_raw(
            &config,
            100_000_000_000 + config.min_box_value,
            (TOTAL, TOTAL),
            (TOTAL - 50_000_000_000, TOTAL - 20_000_000_000),
            (0, 1_000_000_000),
        );
        if let Some(volume) = volume_to_stable {
            raw.additional_registers.insert(
                RegisterId::R7,
                RegisterValue::Serialized(encode_long_array(&volume).unwrap()),
            );
        }
        ReserveBox::from_raw(raw, &config).unwrap()
    }

    fn oracle() -> OracleBox {
        // 1 ERG per gram
        OracleBox::from_raw(oracle_raw(1_000_000_000_000)).unwrap()
    }

    #[test]
    fn test_tvl_sums_both_supplies() {
        // 50 stable at 1 ERG plus 20 volatile at 2.5 ERG
        assert_eq!(tvl(&reserve_with(None), &oracle()).unwrap(), 100_000_000_000);
    }

    #[test]
    fn test_reserve_ratios() {
        let r = reserve_with(None);
        let o = oracle();
        assert_eq!(normalized_reserve_ratio(&r, &o).unwrap(), 200 * NANO);
        assert_eq!(reserve_ratio(&r, &o).unwrap(), 200 * NANO);
    }

    #[test]
    fn test_price_crash_cushion() {
        // 100 * (200 - 151.515151515) / 200
        assert_eq!(price_crash_cushion(200 * NANO).unwrap(), 24_242_424_242);
        assert_eq!(price_crash_cushion(CUSHION_FLOOR).unwrap(), 0);
        assert_eq!(price_crash_cushion(120 * NANO).unwrap(), 0);
    }

    #[test]
    fn test_zero_oracle_price() {
        let r = reserve_with(None);
        let o = OracleBox::from_raw(oracle_raw(0)).unwrap();
        assert_matches!(
            reserve_ratio(&r, &o),
            Err(ReactorError::Domain(DomainError::ZeroOraclePrice))
        );
    }

    #[test]
    fn test_volume_windows() {
        let mut volume = vec![0u64; 14];
        volume[0] = 5;
        volume[3] = 7;
        volume[10] = 11;
        let r = reserve_with(Some(volume));

        let stats = protocol_stats(&r, &oracle()).unwrap();
        let to_stable: Vec<_> = stats.volumes.iter().map(|v| (v.epochs, v.to_stable)).collect();
        assert_eq!(to_stable, vec![(1, 5), (7, 12), (14, 23)]);
        assert!(stats.volumes.iter().all(|v| v.to_volatile == 0));
        assert_eq!(stats.gold_price, NANO);
        assert_eq!(stats.price_crash_cushion, 24_242_424_242);
    }

    #[test]
    fn test_window_beyond_buckets() {
        assert_matches!(
            volume_summary(&reserve_with(None), 15),
            Err(ReactorError::Range { requested: 15, max: 14 })
        );
    }
}
