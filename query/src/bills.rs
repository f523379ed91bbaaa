use agora_governance::tally;
use agora_store::{BalanceOracle, BillRecord, LedgerView};
use agora_types::{BillId, KeyId};

use crate::{BillInfo, BillStatus, OptionVoters, QueryEngine, QueryError, VoterBill, VoterWeight};

impl<V, O> QueryEngine<'_, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    /// Frozen values if the applier froze the bill, otherwise a live tally.
    ///
    /// A bill past its end that the applier has not reached yet is reported
    /// finished with live values.
    fn bill_status(&self, bill: &BillRecord) -> Result<BillStatus, QueryError> {
        if let Some(state) = self.view.bill_state(&bill.id)? {
            return Ok(BillStatus {
                finished: true,
                passed: state.passed,
                winning_option: state.winning_option,
                total_vote: state.total_vote,
                option_totals: state.option_totals,
                finalized_height: Some(state.finalized_height),
            });
        }
        let votes = self.view.bill_votes(&bill.id)?;
        let live = tally(
            bill.options.len(),
            votes
                .iter()
                .map(|(voter, vote)| (vote.option, self.oracle.spendable_balance(voter))),
        );
        Ok(BillStatus {
            finished: bill.is_finished_at(self.at.time),
            passed: live.passed,
            winning_option: live.winning_option,
            total_vote: live.total_vote,
            option_totals: live.option_totals,
            finalized_height: None,
        })
    }

    fn bill_info(&self, bill: BillRecord) -> Result<BillInfo, QueryError> {
        let status = self.bill_status(&bill)?;
        Ok(BillInfo {
            id: bill.id,
            title: bill.title,
            detail: bill.detail,
            url: bill.url,
            committee: bill.committee,
            start_time: bill.start_time,
            end_time: bill.end_time,
            options: bill.options,
            status,
        })
    }

    pub fn bill(&self, id: &BillId) -> Result<Option<BillInfo>, QueryError> {
        self.view
            .bill(id)?
            .map(|bill| self.bill_info(bill))
            .transpose()
    }

    pub fn list_bills(&self) -> Result<Vec<BillInfo>, QueryError> {
        self.view
            .bills()?
            .into_iter()
            .map(|bill| self.bill_info(bill))
            .collect()
    }

    /// Voters grouped by option. Weights are live until the bill is frozen
    /// and the frozen weights afterwards.
    pub fn bill_voters(&self, id: &BillId) -> Result<Vec<OptionVoters>, QueryError> {
        let Some(bill) = self.view.bill(id)? else {
            return Ok(Vec::new());
        };
        let mut groups: Vec<OptionVoters> = (0..bill.options.len())
            .map(|i| OptionVoters {
                index: i as u8,
                voters: Vec::new(),
            })
            .collect();
        for (voter, vote) in self.view.bill_votes(id)? {
            let votes = match vote.weight {
                Some(frozen) => frozen,
                None => self.oracle.spendable_balance(&voter),
            };
            if let Some(group) = groups.get_mut(usize::from(vote.option)) {
                group.voters.push(VoterWeight {
                    address: voter,
                    votes,
                });
            }
        }
        Ok(groups)
    }

    pub fn voter_bills(&self, voter: &KeyId) -> Result<Vec<VoterBill>, QueryError> {
        let mut out = Vec::new();
        for bill in self.view.voter_bills(voter)? {
            if let Some(vote) = self.view.bill_vote(&bill, voter)? {
                out.push(VoterBill {
                    bill,
                    option: vote.option,
                });
            }
        }
        Ok(out)
    }
}
