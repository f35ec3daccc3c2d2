use alloy_primitives::Address;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::collector::decoder::EventDecoder;
use crate::explorer::ReceiptFetcher;
use crate::models::datasets::logs::TransferEvent;
use crate::models::datasets::transactions::ContractTransaction;
use crate::utils::format_address;

/// Seed settlement addresses plus whatever discovery adds. Only grows, and only
/// until frozen.
#[derive(Debug, Clone, Default)]
pub struct SettlementSet {
    known: Vec<Address>,
    discovered: Vec<Address>,
    frozen: bool,
}

impl SettlementSet {
    pub fn new(known: Vec<Address>) -> Self {
        let mut deduped = Vec::with_capacity(known.len());
        for address in known {
            if !deduped.contains(&address) {
                deduped.push(address);
            }
        }
        Self {
            known: deduped,
            discovered: Vec::new(),
            frozen: false,
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.known.contains(address) || self.discovered.contains(address)
    }

    pub fn is_known(&self, address: &Address) -> bool {
        self.known.contains(address)
    }

    /// Returns false when the address is already tracked or the set is frozen.
    pub fn add_discovered(&mut self, address: Address) -> bool {
        if self.frozen {
            warn!(
                "Settlement set is frozen, ignoring {}",
                format_address(&address)
            );
            return false;
        }
        if self.contains(&address) {
            return false;
        }
        self.discovered.push(address);
        true
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn discovered(&self) -> &[Address] {
        &self.discovered
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.known.iter().chain(self.discovered.iter())
    }

    pub fn len(&self) -> usize {
        self.known.len() + self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveryCandidate {
    pub address: Address,
    /// Number of sampled transactions with at least one transfer to `address`
    pub frequency: usize,
}

/// Proposes settlement addresses from recipient frequency over a sample of
/// contract transactions. Heuristic: an address that simply receives often is
/// accepted too.
pub struct SettlementDiscovery {
    min_occurrences: usize,
    max_new: usize,
}

impl SettlementDiscovery {
    pub fn new(min_occurrences: usize, max_new: usize) -> Self {
        Self {
            min_occurrences,
            max_new,
        }
    }

    /// Decode the sample, rank recipients and add the top new candidates to
    /// `settlements`. Returns the ranked candidates.
    pub async fn discover(
        &self,
        sample: &[ContractTransaction],
        fetcher: &ReceiptFetcher,
        decoder: &EventDecoder,
        settlements: &mut SettlementSet,
    ) -> Vec<DiscoveryCandidate> {
        info!(
            "Sampling {} transactions to discover settlement addresses...",
            sample.len()
        );

        let mut decoded = Vec::with_capacity(sample.len());
        for (i, tx) in sample.iter().enumerate() {
            if i % 5 == 0 {
                info!("Discovery progress: {}/{} transactions", i, sample.len());
            }
            let logs = fetcher.fetch_receipt(&tx.hash).await;
            decoded.push(decoder.decode(&logs));
        }

        let candidates: Vec<DiscoveryCandidate> = tally_recipients(&decoded)
            .into_iter()
            .filter(|candidate| candidate.frequency >= self.min_occurrences)
            .collect();

        for candidate in &candidates {
            info!(
                "Potential settlement address {} appears in {} transactions",
                format_address(&candidate.address),
                candidate.frequency
            );
        }

        let added = self.apply(&candidates, settlements);
        info!("Discovered {} new settlement addresses", added);

        candidates
    }

    /// Add up to `max_new` of the highest ranked candidates that are not seeds.
    pub fn apply(&self, candidates: &[DiscoveryCandidate], settlements: &mut SettlementSet) -> usize {
        let selected: Vec<Address> = candidates
            .iter()
            .filter(|candidate| !settlements.is_known(&candidate.address))
            .take(self.max_new)
            .map(|candidate| candidate.address)
            .collect();

        let mut added = 0;
        for address in selected {
            if settlements.add_discovered(address) {
                added += 1;
            }
        }
        added
    }
}

/// Rank recipients by the number of transactions they receive a transfer in,
/// highest first. Ties are ordered by address. The zero address is ignored.
pub fn tally_recipients(per_transaction: &[Vec<TransferEvent>]) -> Vec<DiscoveryCandidate> {
    let mut frequency: HashMap<Address, usize> = HashMap::new();

    for transfers in per_transaction {
        let recipients: HashSet<Address> = transfers
            .iter()
            .map(|transfer| transfer.to_address)
            .filter(|address| *address != Address::ZERO)
            .collect();
        for address in recipients {
            *frequency.entry(address).or_default() += 1;
        }
    }

    let mut ranked: Vec<DiscoveryCandidate> = frequency
        .into_iter()
        .map(|(address, frequency)| DiscoveryCandidate { address, frequency })
        .collect();
    ranked.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked
}
