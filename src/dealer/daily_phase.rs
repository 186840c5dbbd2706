//! The dealer subsystem's per-day pipeline (D5, §4.10): maturity tick and
//! rebucketing, kernel requote, eligibility, and order flow run once per day
//! as the "Dealer" phase, ahead of Phase B1/B2 settlement; the anchor update
//! (step 7) runs afterward, since it is driven by that day's realized
//! defaults (§8 D-C6: anchors only move here, never mid order flow).

use crate::dealer::anchor;
use crate::dealer::executor;
use crate::dealer::{DealerConfig, TraderPolicyConfig};
use crate::error::ValidationError;
use crate::models::event::Event;
use crate::models::ledger::LedgerState;
use crate::models::AgentKind;
use rust_decimal::Decimal;

/// Steps 1-2: advance every ticket's `remaining_tau`/bucket and move its id
/// between bucket inventory lists when it changes (or drop it once matured —
/// maturity settlement itself runs through the ordinary Phase B2 path since
/// a ticket is just a secondary-market label on a payable).
fn tick_and_rebucket(ledger: &mut LedgerState, day: u64) {
    let buckets = match ledger.dealer() {
        Some(state) => state.buckets.clone(),
        None => return,
    };

    let ticket_ids: Vec<String> = ledger.dealer().map(|s| s.tickets.keys().cloned().collect()).unwrap_or_default();
    let mut moves: Vec<(String, Option<String>, Option<String>)> = Vec::new();

    if let Some(state) = ledger.dealer_mut() {
        for ticket_id in &ticket_ids {
            if let Some(ticket) = state.ticket_mut(ticket_id) {
                if let Some(previous_bucket) = ticket.tick(day, &buckets) {
                    moves.push((ticket_id.clone(), previous_bucket, ticket.bucket().map(|b| b.to_string())));
                }
            }
        }
    }

    for (ticket_id, from_bucket, to_bucket) in moves {
        let owner = ledger.dealer().and_then(|s| s.ticket(&ticket_id)).map(|t| t.owner_id().to_string());
        let owner = match owner {
            Some(o) => o,
            None => continue,
        };
        let is_dealer = owner.starts_with("DEALER_");
        let is_vbt = owner.starts_with("VBT_");

        if let Some(from) = &from_bucket {
            if let Some(state) = ledger.dealer_mut() {
                if is_dealer {
                    if let Some(record) = state.dealer_mut(from) {
                        record.ticket_ids.retain(|id| id != &ticket_id);
                    }
                } else if is_vbt {
                    if let Some(record) = state.vbt_mut(from) {
                        record.ticket_ids.retain(|id| id != &ticket_id);
                    }
                }
            }
        }
        if let Some(to) = &to_bucket {
            if is_dealer || is_vbt {
                // The dealer/VBT agent ids are bucket-specific (`DEALER_<bucket>`);
                // a rebucketed ticket held by a market maker moves to that same
                // maker's record in the new bucket.
                if let Some(state) = ledger.dealer_mut() {
                    if is_dealer {
                        if let Some(record) = state.dealer_mut(to) {
                            record.ticket_ids.push(ticket_id.clone());
                        }
                    } else if let Some(record) = state.vbt_mut(to) {
                        record.ticket_ids.push(ticket_id.clone());
                    }
                }
            }
        }

        if from_bucket.is_some() || to_bucket.is_some() {
            let holder_kind = if is_dealer { "dealer" } else if is_vbt { "vbt" } else { "trader" };
            ledger.log(Event::DealerRebucket {
                day,
                ticket_id,
                from_bucket: from_bucket.unwrap_or_default(),
                to_bucket: to_bucket.unwrap_or_default(),
                holder_kind: holder_kind.to_string(),
            });
        }
    }
}

fn recompute_all_quotes(ledger: &mut LedgerState) {
    let bucket_names = ledger.dealer().map(|s| s.bucket_names()).unwrap_or_default();
    if let Some(state) = ledger.dealer_mut() {
        for bucket in &bucket_names {
            state.recompute_quote(bucket);
        }
    }
}

/// Sum of `agent_id`'s cash-like (MOP) balances — the "cash" side of both
/// eligibility predicates (§4.10 step 4).
fn cash_on_hand(ledger: &LedgerState, agent_id: &str) -> i64 {
    ledger
        .agent(agent_id)
        .map(|agent| {
            agent
                .asset_ids()
                .iter()
                .filter_map(|id| ledger.instrument(id).ok())
                .filter(|i| i.kind().is_cash_like())
                .map(|i| i.amount())
                .sum()
        })
        .unwrap_or(0)
}

/// Total face amount of `agent_id`'s payable/delivery-obligation liabilities
/// due within `[day, day + horizon]` — the dues side of the SELL shortfall
/// projection.
fn liabilities_due_within(ledger: &LedgerState, agent_id: &str, day: u64, horizon: u64) -> i64 {
    ledger
        .agent(agent_id)
        .map(|agent| {
            agent
                .liability_ids()
                .iter()
                .filter_map(|id| ledger.instrument(id).ok())
                .filter_map(|i| i.due_day().map(|due| (due, i.amount())))
                .filter(|(due, _)| *due >= day && *due <= day + horizon)
                .map(|(_, amount)| amount)
                .sum()
        })
        .unwrap_or(0)
}

/// Total face amount of `agent_id`'s payable/delivery-obligation claims
/// maturing within `[day, day + horizon]` — the expected-incoming side of
/// the SELL shortfall projection.
fn claims_due_within(ledger: &LedgerState, agent_id: &str, day: u64, horizon: u64) -> i64 {
    ledger
        .agent(agent_id)
        .map(|agent| {
            agent
                .asset_ids()
                .iter()
                .filter_map(|id| ledger.instrument(id).ok())
                .filter_map(|i| i.due_day().map(|due| (due, i.amount())))
                .filter(|(due, _)| *due >= day && *due <= day + horizon)
                .map(|(_, amount)| amount)
                .sum()
        })
        .unwrap_or(0)
}

/// Days until `agent_id`'s earliest still-outstanding liability comes due,
/// or `None` if it has none (treated as "no binding horizon").
fn days_to_next_liability(ledger: &LedgerState, agent_id: &str, day: u64) -> Option<u64> {
    ledger.agent(agent_id).ok()?.liability_ids().iter().filter_map(|id| ledger.instrument(id).ok()).filter_map(|i| i.due_day()).filter(|due| *due >= day).map(|due| due - day).min()
}

/// Non-dealer, non-VBT agents eligible to trade `bucket` today (§4.10 step
/// 4): SELL-eligible means holding at least one ticket in `bucket` *and*
/// a projected shortfall within the policy horizon (dues due within the
/// horizon exceed cash on hand plus claims maturing within the same
/// horizon); BUY-eligible means cash on hand exceeds the policy buffer *and*
/// the agent's next liability, if any, is at least the horizon away.
fn eligible_traders(ledger: &LedgerState, bucket: &str, day: u64, policy: &TraderPolicyConfig) -> (Vec<(String, String)>, Vec<String>) {
    let state = match ledger.dealer() {
        Some(s) => s,
        None => return (Vec::new(), Vec::new()),
    };

    let mut sellers = Vec::new();
    let mut buyers = Vec::new();

    for agent in ledger.agents() {
        if matches!(agent.kind(), AgentKind::Dealer | AgentKind::Vbt) {
            continue;
        }
        let held: Vec<&str> = agent
            .asset_ids()
            .iter()
            .filter_map(|id| state.payable_to_ticket.get(id))
            .filter_map(|ticket_id| state.ticket(ticket_id))
            .filter(|t| t.bucket() == Some(bucket))
            .map(|t| t.id())
            .collect();

        if !held.is_empty() {
            let dues = liabilities_due_within(ledger, agent.id(), day, policy.horizon_h);
            let expected = cash_on_hand(ledger, agent.id()) + claims_due_within(ledger, agent.id(), day, policy.horizon_h);
            if dues > expected {
                for ticket_id in &held {
                    sellers.push((agent.id().to_string(), ticket_id.to_string()));
                }
            }
        }

        let cash = cash_on_hand(ledger, agent.id());
        let next_liability = days_to_next_liability(ledger, agent.id(), day);
        if cash > policy.buffer_b && next_liability.map_or(true, |d| d >= policy.horizon_h) {
            buyers.push(agent.id().to_string());
        }
    }

    (sellers, buyers)
}

/// Steps 4-5: build SELL/BUY-eligible sets per bucket and draw between 1 and
/// `n_max` customer orders, each independently directed SELL with
/// probability `pi_sell`, participant chosen uniformly among the eligible
/// set for that side via the ledger's single PRNG (§9). The eligible sets
/// are recomputed fresh before every draw, so a participant a trade just
/// made ineligible (ticket sold, cash spent below the buffer) is dropped
/// before the next draw rather than redrawable within the same bucket.
fn run_order_flow(ledger: &mut LedgerState, config: &DealerConfig) -> Result<(), ValidationError> {
    let bucket_names = config.buckets.iter().map(|b| b.name.clone()).collect::<Vec<_>>();
    let day = ledger.day();
    for bucket in &bucket_names {
        let (sellers, buyers) = eligible_traders(ledger, bucket, day, &config.trader_policy);
        if sellers.is_empty() && buyers.is_empty() {
            continue;
        }

        let draw_count = 1 + (ledger.rng().range(0, config.order_flow.n_max.max(1) as i64) as u64);
        for _ in 0..draw_count {
            let (sellers, buyers) = eligible_traders(ledger, bucket, day, &config.trader_policy);
            if sellers.is_empty() && buyers.is_empty() {
                break;
            }

            let roll = ledger.rng().next_f64();
            let want_sell = Decimal::try_from(roll).unwrap_or(Decimal::ZERO) < config.order_flow.pi_sell;

            if want_sell && !sellers.is_empty() {
                let index = ledger.rng().range(0, sellers.len() as i64) as usize;
                let (trader_id, ticket_id) = sellers[index].clone();
                executor::execute_sell(ledger, &trader_id, bucket, &ticket_id)?;
            } else if !want_sell && !buyers.is_empty() {
                let index = ledger.rng().range(0, buyers.len() as i64) as usize;
                let trader_id = buyers[index].clone();
                executor::execute_buy(ledger, &trader_id, bucket)?;
            }
        }
    }
    Ok(())
}

/// Run steps 1-5 of the daily dealer phase. A no-op when no dealer
/// subsystem is installed.
pub fn run_dealer_phase(ledger: &mut LedgerState, config: &DealerConfig) -> Result<(), ValidationError> {
    if !ledger.has_dealer() {
        return Ok(());
    }
    let day = ledger.day();
    tick_and_rebucket(ledger, day);
    recompute_all_quotes(ledger);
    run_order_flow(ledger, config)?;
    Ok(())
}

/// Step 7: after that day's settlement has recorded its defaults, compute
/// each bucket's realized loss rate from the `DefaultEvent`s tied to
/// payables whose ticket belonged to that bucket, move the VBT's anchors,
/// and requote. Buckets with no defaults today are left untouched (§8 D-C6).
pub fn run_anchor_update(ledger: &mut LedgerState) {
    if !ledger.has_dealer() {
        return;
    }
    let day = ledger.day();

    let mut by_bucket: std::collections::BTreeMap<String, Vec<(i64, Decimal)>> = std::collections::BTreeMap::new();
    {
        let state = match ledger.dealer() {
            Some(s) => s,
            None => return,
        };
        for event in ledger.events().events_for_day(day) {
            if let Event::DefaultEvent { obligation_id, face_amount, recovery_rate, .. } = event {
                if let Some(ticket_id) = state.payable_to_ticket.get(obligation_id) {
                    if let Some(ticket) = state.ticket(ticket_id) {
                        if let Some(bucket) = ticket.bucket() {
                            by_bucket.entry(bucket.to_string()).or_default().push((*face_amount, *recovery_rate));
                        }
                    }
                }
            }
        }
    }

    for (bucket, defaults) in by_bucket {
        let loss_rate = match anchor::realized_loss_rate(&defaults) {
            Some(rate) => rate,
            None => continue,
        };
        let (mid, spread, phi_m, phi_o, o_min) = match ledger.dealer().and_then(|s| s.vbt(&bucket)) {
            Some(vbt) => (vbt.mid, vbt.spread, vbt.phi_m, vbt.phi_o, vbt.o_min),
            None => continue,
        };
        let (new_mid, new_spread) = anchor::update_anchor(mid, spread, loss_rate, phi_m, phi_o, o_min);
        if let Some(state) = ledger.dealer_mut() {
            if let Some(vbt) = state.vbt_mut(&bucket) {
                vbt.mid = new_mid;
                vbt.spread = new_spread;
            }
            state.recompute_quote(&bucket);
        }
        ledger.log(Event::VbtAnchorUpdate { day, bucket, mid: new_mid, spread: new_spread, loss_rate });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::kernel;
    use crate::dealer::state::{DealerBucketRecord, DealerState, VbtBucketRecord};
    use crate::dealer::ticket::{BucketDef, Ticket};
    use crate::dealer::OrderFlowConfig;
    use crate::dealer::TraderPolicyConfig;
    use crate::models::{Agent, AgentKind};
    use rust_decimal_macros::dec;

    fn wired_ledger() -> LedgerState {
        let mut ledger = LedgerState::new(7);
        ledger.insert_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank));
        ledger.insert_agent(Agent::new("H1", "Household One", AgentKind::Household));
        ledger.insert_agent(Agent::new("H2", "Household Two", AgentKind::Household));
        ledger.insert_agent(Agent::new("DEALER_short", "Dealer", AgentKind::Dealer));
        ledger.insert_agent(Agent::new("VBT_short", "VBT", AgentKind::Vbt));
        crate::ops::mint_cash(&mut ledger, "CB", "DEALER_short", 1000, "cents", None).unwrap();
        crate::ops::mint_cash(&mut ledger, "CB", "VBT_short", 1000, "cents", None).unwrap();
        crate::ops::mint_cash(&mut ledger, "CB", "H1", 1000, "cents", None).unwrap();

        let payable_id = crate::ops::create_payable(&mut ledger, "CB", "H1", 100, 20, None, None).unwrap();
        // H1 owes more than its cash on hand within the policy horizon, so
        // it carries a projected shortfall and is SELL-eligible.
        crate::ops::create_payable(&mut ledger, "H1", "H2", 2000, 3, None, None).unwrap();

        let buckets = vec![BucketDef::new("short", 1, Some(10)), BucketDef::new("long", 11, None)];
        let mut state = DealerState::new(buckets.clone(), dec!(100), dec!(2));
        let ticket = Ticket::new("tk_1", "CB", "H1", 100, 20, 0, 1, &buckets);
        state.tickets.insert("tk_1".into(), ticket);
        state.source_payable.insert("tk_1".into(), payable_id.clone());
        state.payable_to_ticket.insert(payable_id, "tk_1".into());
        for name in ["short", "long"] {
            state.dealers.insert(
                name.into(),
                DealerBucketRecord {
                    bucket: name.into(),
                    agent_id: format!("DEALER_{name}"),
                    cash: dec!(1000),
                    ticket_ids: Vec::new(),
                    quote: kernel::compute_quote(0, dec!(1000), dec!(100), dec!(100), dec!(10), dec!(2), true),
                },
            );
            state.vbts.insert(
                name.into(),
                VbtBucketRecord {
                    bucket: name.into(),
                    agent_id: format!("VBT_{name}"),
                    mid: dec!(100),
                    spread: dec!(10),
                    phi_m: dec!(0.1),
                    phi_o: dec!(0.05),
                    o_min: dec!(1),
                    clip_bid_zero: true,
                    ticket_ids: Vec::new(),
                    cash: dec!(1000),
                },
            );
        }
        ledger.install_dealer(state);
        ledger
    }

    fn sample_config() -> DealerConfig {
        DealerConfig {
            ticket_size: dec!(100),
            guard_m_min: dec!(2),
            buckets: vec![
                crate::dealer::BucketSpec { name: "short".into(), tau_min: 1, tau_max: Some(10), mid: dec!(100), spread: dec!(10) },
                crate::dealer::BucketSpec { name: "long".into(), tau_min: 11, tau_max: None, mid: dec!(100), spread: dec!(10) },
            ],
            dealer_share: dec!(0.5),
            vbt_share: dec!(0.25),
            phi_m: dec!(0.1),
            phi_o: dec!(0.05),
            o_min: dec!(1),
            clip_bid_zero: true,
            order_flow: OrderFlowConfig { pi_sell: dec!(0.9), n_max: 2 },
            trader_policy: TraderPolicyConfig { horizon_h: 5, buffer_b: 5 },
        }
    }

    #[test]
    fn tick_moves_ticket_to_long_bucket_initially_and_is_idempotent_same_day() {
        let mut ledger = wired_ledger();
        // maturity_day 20, day 0 -> remaining_tau 20 falls in "long".
        tick_and_rebucket(&mut ledger, 0);
        assert_eq!(ledger.dealer().unwrap().ticket("tk_1").unwrap().bucket(), Some("long"));
    }

    #[test]
    fn order_flow_executes_at_least_one_trade_when_seller_eligible() {
        let mut ledger = wired_ledger();
        tick_and_rebucket(&mut ledger, 0);
        recompute_all_quotes(&mut ledger);
        let config = sample_config();
        run_order_flow(&mut ledger, &config).unwrap();
        // H1 is the only seller-eligible trader with pi_sell=0.9; expect at
        // least one trade to have landed across the run.
        assert!(!ledger.dealer().unwrap().metrics.trades().is_empty());
    }

    #[test]
    fn anchor_update_is_noop_with_no_defaults_today() {
        let mut ledger = wired_ledger();
        let before = ledger.dealer().unwrap().vbt("long").unwrap().mid;
        run_anchor_update(&mut ledger);
        assert_eq!(ledger.dealer().unwrap().vbt("long").unwrap().mid, before);
    }

    #[test]
    fn eligible_traders_sell_requires_shortfall_not_just_a_ticket() {
        let mut ledger = wired_ledger();
        tick_and_rebucket(&mut ledger, 0);
        let policy = TraderPolicyConfig { horizon_h: 5, buffer_b: 5 };
        let (sellers, _) = eligible_traders(&ledger, "long", 0, &policy);
        assert_eq!(sellers, vec![("H1".to_string(), "tk_1".to_string())], "H1's 2000-due-day-3 liability exceeds its 1000 cash");

        // Extinguish H1's near-term liability directly: same ticket
        // holding, no more shortfall, no longer SELL-eligible.
        let liability_id = ledger.agent("H1").unwrap().liability_ids()[0].clone();
        ledger.remove_instrument(&liability_id);
        ledger.agent_mut("H1").unwrap().remove_liability(&liability_id);
        ledger.agent_mut("H2").unwrap().remove_asset(&liability_id);
        let (sellers_after, _) = eligible_traders(&ledger, "long", 0, &policy);
        assert!(sellers_after.is_empty());
    }

    #[test]
    fn eligible_traders_buy_requires_cash_above_buffer_and_distant_horizon() {
        let ledger = wired_ledger();
        let policy = TraderPolicyConfig { horizon_h: 5, buffer_b: 5 };
        // H1 has a liability due in 3 days, inside the 5-day horizon, so it
        // is not BUY-eligible even though its cash (1000) clears the buffer.
        let (_, buyers) = eligible_traders(&ledger, "long", 0, &policy);
        assert!(!buyers.contains(&"H1".to_string()));
    }
}
