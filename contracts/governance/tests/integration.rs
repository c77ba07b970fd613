
use cosmwasm_std::{coin, Uint128};

use futarchy::escrow::{EscrowError, Side};
use futarchy::governance::{ExecuteMsg, QueryMsg, TreasuryResponse};
use futarchy::math::SignedU128;
use futarchy::pool::SwapDirection;
use futarchy::proposal::{GrantTier, ProposalAction, ProposalState};

use futarchy_governance::error::ContractError;

use helper::{has_event, Suite, ASSET, EXECUTION_MS, FEE_PER_OUTCOME, REVIEW_MS, STABLE, TRADING_MS};

#[test]
fn accept_outcome_wins_executes_and_redeems() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let id = suite.create_proposal(&["reject", "accept"]);
    suite.stage_action(
        id,
        1,
        ProposalAction::Memo {
            text: "ship it".to_string(),
        },
    );
    suite.advance_to_trading(id);

    // Buy ACCEPT-asset with conditional stable coins
    let alice = suite.alice.clone();
    suite.mint_complete_set(&alice, id, Side::Stable, 20_000_000_000);
    suite.wait_ms(1_000);
    suite
        .swap_conditional(&alice, id, 1, SwapDirection::StableForAsset, 20_000_000_000)
        .unwrap();

    let response = suite.finalize_after_trading(id);
    assert!(has_event(&response, "proposal_market_finalized"));
    assert!(has_event(&response, "execution_window_started"));

    let proposal = suite.proposal(id);
    assert_eq!(proposal.state, ProposalState::AwaitingExecution);
    assert_eq!(proposal.market_winner, Some(1));

    let bob = suite.bob.clone();
    let response = suite
        .execute(&bob, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();
    assert!(has_event(&response, "proposal_execution_succeeded"));

    let proposal = suite.proposal(id);
    assert_eq!(proposal.state, ProposalState::Finalized);
    assert_eq!(proposal.executed_outcome, Some(1));

    // Winning-side conditional asset redeems 1:1 into spot asset
    let winning_asset = suite.conditional_balance(id, 1, &alice).asset;
    assert!(!winning_asset.is_zero());
    let before = suite.bank_balance(&alice, ASSET);
    suite
        .execute(
            &alice,
            &ExecuteMsg::Redeem {
                proposal_id: id,
                outcome: 1,
                side: Side::Asset,
                amount: winning_asset,
            },
            &[],
        )
        .unwrap();
    assert_eq!(
        suite.bank_balance(&alice, ASSET),
        before + winning_asset.u128()
    );

    // The escrow stays solvent after redemption
    let escrow = suite.escrow(id);
    escrow.assert_solvent().unwrap();
}

#[test]
fn reject_wins_by_default() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let id = suite.open_market(&["reject", "accept"]);
    // Alice holds some ACCEPT coins but nobody trades
    let alice = suite.alice.clone();
    suite.mint_complete_set(&alice, id, Side::Asset, 1_000_000);

    suite.finalize_after_trading(id);
    let proposal = suite.proposal(id);
    assert_eq!(proposal.market_winner, Some(0));

    let owner = suite.owner.clone();
    let response = suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();
    assert!(has_event(&response, "proposal_execution_succeeded"));
    assert_eq!(suite.proposal(id).executed_outcome, Some(0));

    // ACCEPT-side coins are dead
    let err = suite.execute_err(
        &alice,
        &ExecuteMsg::Redeem {
            proposal_id: id,
            outcome: 1,
            side: Side::Asset,
            amount: Uint128::new(1_000_000),
        },
        &[],
    );
    assert_eq!(err, ContractError::Escrow(EscrowError::NotAWinner {}));
}

#[test]
fn equal_twaps_resolve_to_the_lowest_outcome() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let id = suite.open_market(&["reject", "a", "b", "c"]);
    let bob = suite.bob.clone();
    suite.mint_complete_set(&bob, id, Side::Stable, 100_000_000);

    // Identical buys on outcomes 2 and 3 in the same block produce bitwise
    // equal TWAPs
    suite.wait_ms(1_000);
    suite
        .swap_conditional(&bob, id, 2, SwapDirection::StableForAsset, 40_000_000)
        .unwrap();
    suite
        .swap_conditional(&bob, id, 3, SwapDirection::StableForAsset, 40_000_000)
        .unwrap();

    suite.finalize_after_trading(id);

    let proposal = suite.proposal(id);
    assert_eq!(proposal.market_winner, Some(2));
}

#[test]
fn lp_withdrawal_queues_through_transitioning() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let alice = suite.alice.clone();
    suite
        .execute(
            &alice,
            &ExecuteMsg::ProvideLiquidity { min_lp: None },
            &[coin(100_000_000, ASSET), coin(100_000_000, STABLE)],
        )
        .unwrap();
    let shares = suite.lp_position(&alice).live;
    assert_eq!(shares, Uint128::new(100_000_000));

    let id = suite.open_market(&["reject", "accept"]);

    // Liquidity operations are frozen, but marking for withdrawal queues
    let err = suite.execute_err(
        &alice,
        &ExecuteMsg::WithdrawLiquidity {
            lp_amount: shares,
            min_asset: None,
            min_stable: None,
        },
        &[],
    );
    assert_eq!(err, ContractError::LpLockedInProposal {});

    suite
        .execute(&alice, &ExecuteMsg::MarkForWithdrawal { lp_amount: shares }, &[])
        .unwrap();
    let position = suite.lp_position(&alice);
    assert_eq!(position.transitioning, shares);

    let err = suite.execute_err(
        &alice,
        &ExecuteMsg::ClaimWithdrawal { lp_amount: shares },
        &[],
    );
    assert_eq!(err, ContractError::LpLockedInProposal {});

    suite.finalize_after_trading(id);

    let asset_before = suite.bank_balance(&alice, ASSET);
    suite
        .execute(&alice, &ExecuteMsg::ClaimWithdrawal { lp_amount: shares }, &[])
        .unwrap();
    assert!(suite.bank_balance(&alice, ASSET) > asset_before);

    let position = suite.lp_position(&alice);
    assert!(position.transitioning.is_zero());
    assert!(position.withdraw_only.is_zero());
}

#[test]
fn spot_swaps_stay_inside_the_no_arb_band() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);
    let id = suite.open_market(&["reject", "accept"]);

    let bob = suite.bob.clone();
    suite.mint_complete_set(&bob, id, Side::Stable, 1_000_000_000);
    suite.mint_complete_set(&bob, id, Side::Asset, 1_000_000_000);
    suite.wait_ms(1_000);

    // Price ACCEPT around 1.5 and REJECT around 0.5
    suite
        .swap_conditional(&bob, id, 1, SwapDirection::StableForAsset, 112_000_000)
        .unwrap();
    suite
        .swap_conditional(&bob, id, 0, SwapDirection::AssetForStable, 207_000_000)
        .unwrap();

    let band = suite.band(id);
    assert!(band.spot_price >= band.floor && band.spot_price <= band.ceiling);

    // A sell large enough to push the spot price to ~0.3 either reverts or
    // triggers arbitrage that re-centers it
    let result = suite.execute(
        &bob,
        &ExecuteMsg::SwapSpot {
            direction: SwapDirection::AssetForStable,
            min_out: Uint128::zero(),
            to: None,
        },
        &[coin(413_000_000, ASSET)],
    );

    match result {
        Ok(response) => {
            assert!(has_event(&response, "arbitrage_executed"));
        }
        Err(err) => {
            assert_eq!(
                err.downcast::<ContractError>().unwrap(),
                ContractError::NoArbBandViolated {}
            );
        }
    }

    let band = suite.band(id);
    assert!(
        band.spot_price >= band.floor && band.spot_price <= band.ceiling,
        "spot price {} outside [{}, {}]",
        band.spot_price,
        band.floor,
        band.ceiling
    );

    suite.escrow(id).assert_solvent().unwrap();
}

#[test]
fn execution_window_times_out() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let id = suite.create_proposal(&["reject", "accept"]);
    suite.stage_action(
        id,
        1,
        ProposalAction::Memo {
            text: "never runs".to_string(),
        },
    );
    suite.advance_to_trading(id);

    let alice = suite.alice.clone();
    suite.mint_complete_set(&alice, id, Side::Stable, 1_000_000_000);
    suite.wait_ms(1_000);
    suite
        .swap_conditional(&alice, id, 1, SwapDirection::StableForAsset, 500_000_000)
        .unwrap();

    suite.finalize_after_trading(id);
    assert_eq!(suite.proposal(id).market_winner, Some(1));

    // Nobody executes within the window
    suite.wait_ms(EXECUTION_MS + 1_000);
    let owner = suite.owner.clone();
    let response = suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();
    assert!(has_event(&response, "execution_timed_out"));

    let proposal = suite.proposal(id);
    assert_eq!(proposal.state, ProposalState::Finalized);
    assert_eq!(proposal.executed_outcome, None);
    assert!(proposal.execution_error.is_some());
}

#[test]
fn complete_sets_mint_and_burn_round_trip() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);
    let id = suite.open_market(&["reject", "accept"]);

    let alice = suite.alice.clone();
    let before = suite.bank_balance(&alice, ASSET);
    suite.mint_complete_set(&alice, id, Side::Asset, 1_000_000);
    assert_eq!(suite.bank_balance(&alice, ASSET), before - 1_000_000);

    for outcome in 0..2 {
        assert_eq!(
            suite.conditional_balance(id, outcome, &alice).asset,
            Uint128::new(1_000_000)
        );
    }

    suite
        .execute(
            &alice,
            &ExecuteMsg::BurnCompleteSet {
                proposal_id: id,
                side: Side::Asset,
                amount: Uint128::new(400_000),
            },
            &[],
        )
        .unwrap();
    assert_eq!(suite.bank_balance(&alice, ASSET), before - 600_000);

    // Burning more than the balance in any outcome is a mismatch
    let err = suite.execute_err(
        &alice,
        &ExecuteMsg::BurnCompleteSet {
            proposal_id: id,
            side: Side::Asset,
            amount: Uint128::new(700_000),
        },
        &[],
    );
    assert_eq!(err, ContractError::CompleteSetMismatch {});
}

#[test]
fn cancelled_proposal_refunds_the_fee() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    let before = suite.bank_balance(&owner, STABLE);
    let id = suite.create_proposal(&["reject", "accept"]);
    assert_eq!(
        suite.bank_balance(&owner, STABLE),
        before - 2 * FEE_PER_OUTCOME
    );

    suite
        .execute(&owner, &ExecuteMsg::CancelProposal { proposal_id: id }, &[])
        .unwrap();
    assert_eq!(suite.bank_balance(&owner, STABLE), before);

    // The proposal is gone
    let result: Result<futarchy::proposal::Proposal, _> = suite
        .app
        .wrap()
        .query_wasm_smart(&suite.governance, &QueryMsg::Proposal { proposal_id: id });
    assert!(result.is_err());
}

#[test]
fn sponsorship_bias_decides_an_even_market() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let id = suite.create_proposal(&["reject", "accept"]);
    let bob = suite.bob.clone();
    suite
        .execute(
            &bob,
            &ExecuteMsg::Sponsor {
                proposal_id: id,
                outcome: 1,
                threshold_bias: SignedU128::positive(1u128),
            },
            &[coin(5_000, STABLE)],
        )
        .unwrap();
    suite.advance_to_trading(id);

    // Without trading the TWAP deltas are zero; the pledged bias tips
    // outcome 1 over the threshold
    suite.finalize_after_trading(id);
    assert_eq!(suite.proposal(id).market_winner, Some(1));

    // The attached funds were donated to the treasury
    let treasury: TreasuryResponse = suite
        .app
        .wrap()
        .query_wasm_smart(&suite.governance, &QueryMsg::Treasury {})
        .unwrap();
    assert_eq!(treasury.stable, Uint128::new(5_000 + 2 * FEE_PER_OUTCOME));
}

#[test]
fn treasury_transfer_executes_for_the_winning_outcome() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    suite
        .execute(&owner, &ExecuteMsg::Deposit {}, &[coin(10_000, STABLE)])
        .unwrap();

    let id = suite.create_proposal(&["reject", "accept"]);
    let bob = suite.bob.clone();
    suite.stage_action(
        id,
        1,
        ProposalAction::Transfer {
            recipient: bob.to_string(),
            denom: STABLE.to_string(),
            amount: Uint128::new(7_500),
        },
    );
    suite
        .execute(
            &owner,
            &ExecuteMsg::Sponsor {
                proposal_id: id,
                outcome: 1,
                threshold_bias: SignedU128::positive(1u128),
            },
            &[],
        )
        .unwrap();
    suite.advance_to_trading(id);
    suite.finalize_after_trading(id);

    let before = suite.bank_balance(&bob, STABLE);
    suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();
    assert_eq!(suite.bank_balance(&bob, STABLE), before + 7_500);
    assert_eq!(suite.proposal(id).executed_outcome, Some(1));
}

#[test]
fn failing_handler_finalizes_with_error() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    let bob = suite.bob.clone();
    let id = suite.create_proposal(&["reject", "accept"]);
    // The treasury only holds the proposal fee; this transfer cannot be paid
    suite.stage_action(
        id,
        1,
        ProposalAction::Transfer {
            recipient: bob.to_string(),
            denom: STABLE.to_string(),
            amount: Uint128::new(1_000_000_000),
        },
    );
    suite
        .execute(
            &owner,
            &ExecuteMsg::Sponsor {
                proposal_id: id,
                outcome: 1,
                threshold_bias: SignedU128::positive(1u128),
            },
            &[],
        )
        .unwrap();
    suite.advance_to_trading(id);
    suite.finalize_after_trading(id);

    let before = suite.bank_balance(&bob, STABLE);
    suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();

    let proposal = suite.proposal(id);
    assert_eq!(proposal.state, ProposalState::Finalized);
    assert_eq!(proposal.executed_outcome, None);
    assert!(proposal.execution_error.is_some());
    assert_eq!(suite.bank_balance(&bob, STABLE), before);
}

#[test]
fn streams_and_grants_pay_out_from_the_treasury() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    let alice = suite.alice.clone();
    suite
        .execute(&owner, &ExecuteMsg::Deposit {}, &[coin(100_000, STABLE)])
        .unwrap();

    let id = suite.create_proposal(&["reject", "accept"]);
    suite.stage_action(
        id,
        1,
        ProposalAction::CreateStream {
            recipient: alice.to_string(),
            denom: STABLE.to_string(),
            amount: Uint128::new(10_000),
            start_ms: 0,
            duration_ms: 1_000_000_000,
        },
    );
    suite.stage_action(
        id,
        1,
        ProposalAction::CreateGrant {
            denom: STABLE.to_string(),
            tiers: vec![
                GrantTier {
                    recipient: alice.to_string(),
                    amount: Uint128::new(2_000),
                    threshold: SignedU128::ZERO,
                },
                GrantTier {
                    recipient: alice.to_string(),
                    amount: Uint128::new(3_000),
                    threshold: SignedU128::positive(u128::MAX / 2),
                },
            ],
        },
    );
    suite
        .execute(
            &owner,
            &ExecuteMsg::Sponsor {
                proposal_id: id,
                outcome: 1,
                threshold_bias: SignedU128::positive(1u128),
            },
            &[],
        )
        .unwrap();
    suite.advance_to_trading(id);
    suite.finalize_after_trading(id);
    suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();

    // The stream's schedule started at the epoch, so it is fully vested
    let before = suite.bank_balance(&alice, STABLE);
    suite
        .execute(&owner, &ExecuteMsg::ClaimStream { stream_id: 1 }, &[])
        .unwrap();
    assert_eq!(suite.bank_balance(&alice, STABLE), before + 10_000);

    let err = suite.execute_err(&owner, &ExecuteMsg::ClaimStream { stream_id: 1 }, &[]);
    assert_eq!(err, ContractError::NothingToClaim {});

    // First grant tier unlocks at no movement; the second stays locked
    let before = suite.bank_balance(&alice, STABLE);
    suite
        .execute(
            &owner,
            &ExecuteMsg::ClaimGrant {
                grant_id: 1,
                tier: 0,
            },
            &[],
        )
        .unwrap();
    assert_eq!(suite.bank_balance(&alice, STABLE), before + 2_000);

    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::ClaimGrant {
            grant_id: 1,
            tier: 1,
        },
        &[],
    );
    assert_eq!(err, ContractError::GrantLocked {});

    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::ClaimGrant {
            grant_id: 1,
            tier: 0,
        },
        &[],
    );
    assert_eq!(err, ContractError::GrantAlreadyClaimed {});
}

#[test]
fn update_trading_params_action_applies_to_the_pool() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    let id = suite.create_proposal(&["reject", "accept"]);
    suite.stage_action(
        id,
        1,
        ProposalAction::UpdateTradingParams {
            amm_fee_bps: Some(60),
            spot_fee_bps: Some(45),
            twap_step_max: None,
            twap_start_delay_ms: None,
        },
    );
    suite
        .execute(
            &owner,
            &ExecuteMsg::Sponsor {
                proposal_id: id,
                outcome: 1,
                threshold_bias: SignedU128::positive(1u128),
            },
            &[],
        )
        .unwrap();
    suite.advance_to_trading(id);
    suite.finalize_after_trading(id);
    suite
        .execute(&owner, &ExecuteMsg::Execute { proposal_id: id }, &[])
        .unwrap();

    assert_eq!(suite.spot_pool().fee_bps, 45);
    let config: futarchy::governance::ConfigResponse = suite
        .app
        .wrap()
        .query_wasm_smart(&suite.governance, &QueryMsg::Config {})
        .unwrap();
    assert_eq!(config.params.amm_fee_bps, 60);
    assert_eq!(config.params.spot_fee_bps, 45);
}

#[test]
fn state_machine_guards_reject_early_transitions() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let owner = suite.owner.clone();
    let id = suite.create_proposal(&["reject", "accept"]);

    // Trading before review
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::AdvanceToTrading {
            proposal_id: id,
            split_ratio_pct: None,
        },
        &[],
    );
    assert_eq!(
        err,
        ContractError::InvalidState {
            current: ProposalState::Premarket
        }
    );

    suite
        .execute(&owner, &ExecuteMsg::AdvanceToReview { proposal_id: id }, &[])
        .unwrap();

    // Staging is locked from REVIEW on
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::StageAction {
            proposal_id: id,
            outcome: 1,
            action: ProposalAction::Memo {
                text: "late".to_string(),
            },
        },
        &[],
    );
    assert_eq!(err, ContractError::PremarketLocked {});

    // Review period must elapse
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::AdvanceToTrading {
            proposal_id: id,
            split_ratio_pct: None,
        },
        &[],
    );
    assert_eq!(err, ContractError::ReviewPeriodNotElapsed {});

    suite.wait_ms(REVIEW_MS);

    // The split ratio is bounded
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::AdvanceToTrading {
            proposal_id: id,
            split_ratio_pct: Some(100),
        },
        &[],
    );
    assert_eq!(err, ContractError::InvalidRatio {});

    suite
        .execute(
            &owner,
            &ExecuteMsg::AdvanceToTrading {
                proposal_id: id,
                split_ratio_pct: None,
            },
            &[],
        )
        .unwrap();

    // Finalizing early fails
    let err = suite.execute_err(&owner, &ExecuteMsg::Finalize { proposal_id: id }, &[]);
    assert_eq!(err, ContractError::TradingPeriodNotElapsed {});

    // A second proposal cannot take the spot pool
    let second = suite.create_proposal(&["reject", "other"]);
    suite
        .execute(
            &owner,
            &ExecuteMsg::AdvanceToReview {
                proposal_id: second,
            },
            &[],
        )
        .unwrap();
    suite.wait_ms(REVIEW_MS);
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::AdvanceToTrading {
            proposal_id: second,
            split_ratio_pct: None,
        },
        &[],
    );
    assert_eq!(err, ContractError::SpotPoolBusy { proposal_id: id });

    // Conditional swaps stop once the trading window closed
    suite.wait_ms(TRADING_MS);
    let alice = suite.alice.clone();
    let err = suite
        .swap_conditional(&alice, id, 1, SwapDirection::StableForAsset, 1_000)
        .unwrap_err()
        .downcast::<ContractError>()
        .unwrap();
    assert_eq!(err, ContractError::TradingWindowClosed {});

    // Re-finalizing a finalized market is rejected
    suite
        .execute(&owner, &ExecuteMsg::Finalize { proposal_id: id }, &[])
        .unwrap();
    let err = suite.execute_err(&owner, &ExecuteMsg::Finalize { proposal_id: id }, &[]);
    assert_eq!(
        err,
        ContractError::InvalidState {
            current: ProposalState::AwaitingExecution
        }
    );
}

#[test]
fn proposal_creation_validations() {
    let mut suite = Suite::new();

    // The spot oracle has no history yet
    let owner = suite.owner.clone();
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::CreateProposal {
            title: "t".to_string(),
            introduction: String::new(),
            metadata: String::new(),
            outcome_messages: vec!["reject".to_string(), "accept".to_string()],
        },
        &[coin(2 * FEE_PER_OUTCOME, STABLE)],
    );
    assert_eq!(err, ContractError::SpotOracleNotReady {});

    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    // A single outcome market is not a market
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::CreateProposal {
            title: "t".to_string(),
            introduction: String::new(),
            metadata: String::new(),
            outcome_messages: vec!["reject".to_string()],
        },
        &[coin(FEE_PER_OUTCOME, STABLE)],
    );
    assert_eq!(err, ContractError::OutcomeCountOutOfRange { min: 2, max: 8 });

    // The fee must match exactly
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::CreateProposal {
            title: "t".to_string(),
            introduction: String::new(),
            metadata: String::new(),
            outcome_messages: vec!["reject".to_string(), "accept".to_string()],
        },
        &[coin(FEE_PER_OUTCOME, STABLE)],
    );
    assert_eq!(
        err,
        ContractError::FeeMismatch {
            expected: Uint128::new(2 * FEE_PER_OUTCOME)
        }
    );

    // Unknown action tags cannot be staged without a dispatcher
    let id = suite.create_proposal(&["reject", "accept"]);
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::StageAction {
            proposal_id: id,
            outcome: 1,
            action: ProposalAction::Unknown {
                action_type: "upgrade_package".to_string(),
                payload: Default::default(),
            },
        },
        &[],
    );
    assert_eq!(
        err,
        ContractError::UnknownActionType {
            action_type: "upgrade_package".to_string()
        }
    );

    // Staging against a nonexistent outcome fails
    let err = suite.execute_err(
        &owner,
        &ExecuteMsg::StageAction {
            proposal_id: id,
            outcome: 5,
            action: ProposalAction::Memo {
                text: "m".to_string(),
            },
        },
        &[],
    );
    assert_eq!(err, ContractError::UnknownOutcome { outcome: 5 });
}

#[test]
fn quantum_split_preserves_lp_shares_and_reserve_sums() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);

    let pool_before = suite.spot_pool();
    let lp_before = pool_before.total_lp_shares();

    let id = suite.open_market(&["reject", "accept"]);

    let pool = suite.spot_pool();
    assert_eq!(pool.total_lp_shares(), lp_before);
    assert_eq!(pool.active_proposal_id, Some(id));
    // Half of each side moved into the conditional markets
    assert_eq!(pool.total_asset(), Uint128::new(500_000_000));
    assert_eq!(pool.split_out.total_asset(), Uint128::new(500_000_000));

    let escrow = suite.escrow(id);
    assert_eq!(escrow.spot_asset, Uint128::new(500_000_000));
    assert!(escrow
        .supply_asset
        .iter()
        .all(|supply| *supply == Uint128::new(500_000_000)));

    suite.finalize_after_trading(id);

    let pool = suite.spot_pool();
    assert_eq!(pool.total_lp_shares(), lp_before);
    assert_eq!(pool.total_asset(), Uint128::new(1_000_000_000));
    assert_eq!(pool.total_stable(), Uint128::new(1_000_000_000));
    assert!(pool.active_proposal_id.is_none());
}

#[test]
fn keeper_arbitrage_requires_an_opportunity() {
    let mut suite = Suite::new();
    suite.bootstrap_pool(1_000_000_000, 1_000_000_000);
    let id = suite.open_market(&["reject", "accept"]);

    // Markets open centered: no profitable cycle
    let bob = suite.bob.clone();
    let err = suite.execute_err(
        &bob,
        &ExecuteMsg::Arbitrage {
            proposal_id: id,
            min_profit: Uint128::zero(),
        },
        &[],
    );
    assert_eq!(err, ContractError::NoProfitableArbitrage {});
}
