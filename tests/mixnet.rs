//! End-to-end mix-net election flow on secp256k1: distributed key
//! generation, ballot encryption, a verified re-encryption shuffle, and
//! threshold decryption of the shuffled ballots.

use num_bigint::BigUint;

use verivote::commitment::MultiCommitmentKey;
use verivote::elgamal::{blocks_to_message, encrypt_bytes};
use verivote::group::SecpGroup;
use verivote::shuffle::{shuffle_and_prove, verify_shuffle};
use verivote::threshold::{
    combine_multi_decryption_shares, combined_public_key, create_multi_decryption_share,
    public_key_share, verify_multi_decryption_share, DkgTeller, ThresholdConfig,
};

const BALLOTS: [&[u8]; 4] = [
    b"ballot: option A / district 7",
    b"ballot: option B / district 7",
    b"ballot: option A / district 9",
    b"ballot: abstain  / district 9",
];

#[test]
fn full_election_flow() {
    let group = SecpGroup::new();
    let config = ThresholdConfig::new(2, 3).unwrap();

    // -- distributed key generation
    let tellers: Vec<_> = (1..=config.tellers())
        .map(|k| DkgTeller::new(group, config, k).unwrap())
        .collect();
    let key_shares: Vec<_> = tellers
        .iter()
        .map(|teller| {
            let records: Vec<_> = tellers
                .iter()
                .filter(|other| other.index() != teller.index())
                .map(|other| other.record_for(teller.index()).unwrap())
                .collect();
            teller.finalize(&records).unwrap()
        })
        .collect();
    let coefficient_sets: Vec<Vec<_>> = tellers
        .iter()
        .map(|t| t.blinded_coefficients().to_vec())
        .collect();
    let election_key = combined_public_key(&group, &coefficient_sets, &config).unwrap();

    // anyone can reconstruct each teller's public key share
    for share in &key_shares {
        assert_eq!(
            public_key_share(&group, &coefficient_sets, &config, share.nr).unwrap(),
            share.commitment
        );
    }

    // -- ballot submission (equal-length plaintexts give a uniform width)
    let ballots: Vec<_> = BALLOTS
        .iter()
        .map(|ballot| encrypt_bytes(&group, &election_key, ballot).unwrap())
        .collect();
    let width = ballots[0].width();
    assert!(ballots.iter().all(|b| b.width() == width));

    // -- verified mixing
    let commitment_key = MultiCommitmentKey::derive(&group, ballots.len(), b"election-2026-mix-1");
    let mixed = shuffle_and_prove(&group, &election_key, &commitment_key, &ballots).unwrap();
    assert!(verify_shuffle(
        &group,
        &election_key,
        &commitment_key,
        &ballots,
        &mixed.outputs,
        &mixed.proof
    )
    .is_correct());

    // -- threshold decryption by tellers 1 and 3
    let mut tally: Vec<Vec<u8>> = mixed
        .outputs
        .iter()
        .map(|multi| {
            let shares: Vec<_> = [0usize, 2]
                .iter()
                .map(|&t| {
                    let share = create_multi_decryption_share(&group, &key_shares[t], multi);
                    assert!(verify_multi_decryption_share(
                        &group,
                        &key_shares[t].commitment,
                        multi,
                        &share
                    )
                    .is_correct());
                    share
                })
                .collect();
            let blocks: Vec<BigUint> =
                combine_multi_decryption_shares(&group, &config, multi, &shares).unwrap();
            blocks_to_message(&group, &blocks).unwrap()
        })
        .collect();

    // the decrypted multiset equals the submitted ballots
    let mut expected: Vec<Vec<u8>> = BALLOTS.iter().map(|b| b.to_vec()).collect();
    tally.sort();
    expected.sort();
    assert_eq!(tally, expected);
}

#[test]
fn mix_verification_rejects_a_dropped_ballot() {
    let group = SecpGroup::new();
    let config = ThresholdConfig::new(1, 1).unwrap();
    let teller = DkgTeller::new(group, config, 1).unwrap();
    let key_share = teller.finalize(&[]).unwrap();
    let election_key = key_share.commitment.clone();

    let ballots: Vec<_> = BALLOTS
        .iter()
        .map(|ballot| encrypt_bytes(&group, &election_key, ballot).unwrap())
        .collect();
    let commitment_key = MultiCommitmentKey::derive(&group, ballots.len(), b"election-2026-mix-2");
    let mixed = shuffle_and_prove(&group, &election_key, &commitment_key, &ballots).unwrap();

    let mut truncated = mixed.outputs.clone();
    truncated.pop();
    assert!(!verify_shuffle(
        &group,
        &election_key,
        &commitment_key,
        &ballots,
        &truncated,
        &mixed.proof
    )
    .is_correct());
}
