use cosmwasm_std::{Storage, Uint128};

use futarchy::escrow::Side;
use futarchy::oracle::TwapOracle;
use futarchy::pool::{pool_price, Amm, PoolError};
use futarchy::proposal::Proposal;
use futarchy::spot::SpotPool;

use crate::error::ContractError;
use crate::state::{load_amms, save_amm, save_escrow, Config, AMMS, ESCROWS};

/// Splits the configured fraction of spot liquidity into one conditional
/// market per outcome. The split coins back complete sets minted against the
/// escrow; every market opens at the spot price. LP shares are untouched.
pub fn quantum_split(
    storage: &mut dyn Storage,
    config: &Config,
    proposal: &Proposal,
    pool: &mut SpotPool,
    ratio_pct: u8,
    now_ms: u64,
) -> Result<(Uint128, Uint128), ContractError> {
    let (asset, stable) = pool.quantum_split(ratio_pct)?;
    if asset < config.params.min_conditional_liquidity
        || stable < config.params.min_conditional_liquidity
    {
        return Err(PoolError::InsufficientLiquidity {}.into());
    }

    let mut escrow = ESCROWS.load(storage, proposal.id)?;
    escrow.mint_complete_set(Side::Asset, asset)?;
    escrow.mint_complete_set(Side::Stable, stable)?;

    let price = pool_price(asset, stable)?;
    for outcome in 0..proposal.outcome_count {
        let oracle = TwapOracle::new(
            price,
            now_ms,
            config.params.twap_start_delay_ms,
            config.params.twap_step_max,
        );
        let mut amm = Amm::new(asset, stable, config.params.amm_fee_bps, oracle);
        save_amm(storage, proposal.id, outcome, &mut amm)?;
    }

    escrow.assert_solvent()?;
    save_escrow(storage, &mut escrow)?;
    pool.active_proposal_id = Some(proposal.id);

    Ok((asset, stable))
}

/// Recombines the winning market's holdings into the spot pool via a
/// complete-set burn and drops the losing markets from tracking. Their
/// reserves stay inside the escrow as permanently locked backing for the
/// dead losing-side supply.
pub fn recombine(
    storage: &mut dyn Storage,
    proposal: &Proposal,
    pool: &mut SpotPool,
    winner: u8,
) -> Result<(Uint128, Uint128), ContractError> {
    let mut escrow = ESCROWS.load(storage, proposal.id)?;
    let amms = load_amms(storage, proposal.id, proposal.outcome_count)?;
    let winning = &amms[winner as usize];

    // The winning market's protocol fees are conditional coins of the
    // winning outcome, worth spot 1:1 now; they move to the spot fee pool.
    let drain_asset = winning.reserve_asset + winning.fees_asset;
    let drain_stable = winning.reserve_stable + winning.fees_stable;
    escrow.recombine_burn(winner, Side::Asset, drain_asset)?;
    escrow.recombine_burn(winner, Side::Stable, drain_stable)?;

    pool.recombine(winning.reserve_asset, winning.reserve_stable);
    pool.fees_asset += winning.fees_asset;
    pool.fees_stable += winning.fees_stable;

    for outcome in 0..proposal.outcome_count {
        AMMS.remove(storage, (proposal.id, outcome));
    }

    escrow.assert_solvent()?;
    save_escrow(storage, &mut escrow)?;

    Ok((drain_asset, drain_stable))
}

#[cfg(test)]
mod tests {
    use cosmwasm_std::testing::MockStorage;
    use cosmwasm_std::Addr;

    use futarchy::dao::DaoParams;
    use futarchy::escrow::TokenEscrow;
    use futarchy::math::SignedU128;
    use futarchy::oracle::PcwOracle;
    use futarchy::proposal::ProposalState;

    use super::*;

    fn config() -> Config {
        Config {
            factory: Addr::unchecked("factory"),
            owner: Addr::unchecked("owner"),
            dao_name: "testdao".to_string(),
            asset_denom: "uasset".to_string(),
            stable_denom: "ustable".to_string(),
            params: DaoParams {
                review_period_ms: 30_000,
                trading_period_ms: 60_000,
                execution_window_ms: 120_000,
                amm_fee_bps: 30,
                spot_fee_bps: 30,
                max_outcomes: 8,
                max_actions_per_outcome: 16,
                proposal_fee_per_outcome: Uint128::new(1_000),
                twap_start_delay_ms: 0,
                twap_step_max: Uint128::new(futarchy::math::PRICE_SCALE),
                twap_win_threshold: SignedU128::ZERO,
                conditional_liquidity_ratio_pct: 50,
                min_conditional_liquidity: Uint128::new(1_000),
                pcw_window_ms: 60_000,
                pcw_max_movement_ppm: 1_000_000,
            },
            action_dispatcher: None,
        }
    }

    fn proposal(outcome_count: u8) -> Proposal {
        Proposal {
            id: 1,
            title: "t".to_string(),
            introduction: String::new(),
            metadata: String::new(),
            proposer: Addr::unchecked("proposer"),
            outcome_count,
            outcome_messages: vec![String::new(); outcome_count as usize],
            state: ProposalState::Review,
            created_at_ms: 0,
            review_started_at_ms: Some(0),
            trading_started_at_ms: None,
            trading_ended_at_ms: None,
            execution_deadline_ms: None,
            market_winner: None,
            executed_outcome: None,
            execution_error: None,
            fee_paid: Uint128::zero(),
            version: 1,
        }
    }

    #[test]
    fn split_then_recombine_restores_pool_totals() {
        let mut storage = MockStorage::new();
        let config = config();
        let proposal = proposal(2);

        let mut pool = SpotPool::new(30, PcwOracle::new(60_000, 1_000_000, 0));
        pool.provide(Uint128::new(1_000_000), Uint128::new(1_000_000))
            .unwrap();
        ESCROWS
            .save(&mut storage, 1, &TokenEscrow::new(1, 2))
            .unwrap();

        let lp_before = pool.total_lp_shares();
        let asset_before = pool.total_asset();
        let stable_before = pool.total_stable();

        let (asset, stable) =
            quantum_split(&mut storage, &config, &proposal, &mut pool, 50, 0).unwrap();
        assert_eq!(asset, Uint128::new(500_000));
        assert_eq!(stable, Uint128::new(500_000));
        assert_eq!(pool.active_proposal_id, Some(1));
        assert_eq!(pool.total_lp_shares(), lp_before);

        let escrow = ESCROWS.load(&storage, 1).unwrap();
        assert_eq!(escrow.spot_asset, asset);
        assert!(escrow.supply_asset.iter().all(|s| *s == asset));

        // Both markets exist and are funded identically
        let amms = load_amms(&storage, 1, 2).unwrap();
        assert!(amms.iter().all(|amm| amm.reserve_asset == asset));

        // No trading happened: recombination restores everything
        recombine(&mut storage, &proposal, &mut pool, 1).unwrap();
        assert_eq!(pool.total_lp_shares(), lp_before);
        assert_eq!(pool.total_asset(), asset_before);
        assert_eq!(pool.total_stable(), stable_before);
        assert!(pool.active_proposal_id.is_none());
        assert!(AMMS.may_load(&storage, (1, 0)).unwrap().is_none());

        let escrow = ESCROWS.load(&storage, 1).unwrap();
        escrow.assert_solvent().unwrap();
        // With no user-held conditionals, the full supply burns away
        assert_eq!(escrow.supply_asset, vec![Uint128::zero(); 2]);
        assert_eq!(escrow.spot_asset, Uint128::zero());
    }

    #[test]
    fn split_enforces_minimum_liquidity() {
        let mut storage = MockStorage::new();
        let mut config = config();
        config.params.min_conditional_liquidity = Uint128::new(10_000_000);
        let proposal = proposal(2);

        let mut pool = SpotPool::new(30, PcwOracle::new(60_000, 1_000_000, 0));
        pool.provide(Uint128::new(1_000_000), Uint128::new(1_000_000))
            .unwrap();
        ESCROWS
            .save(&mut storage, 1, &TokenEscrow::new(1, 2))
            .unwrap();

        let err = quantum_split(&mut storage, &config, &proposal, &mut pool, 50, 0).unwrap_err();
        assert_eq!(
            err,
            ContractError::Pool(PoolError::InsufficientLiquidity {})
        );
    }
}
