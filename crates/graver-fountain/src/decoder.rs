//! Frame reassembly.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::choose::choose_fragments;
use crate::error::{FountainError, Result};
use crate::fragment::Fragment;
use crate::{checksum, xor_into};

/// Default cap on stored mixed fragments awaiting resolution.
///
/// Pending storage is bounded by O(seq_len²) distinct basis sets for honest
/// streams; the cap stops an adversarial stream from growing it without
/// limit.
pub const DEFAULT_PENDING_LIMIT: usize = 4096;

/// Header fields every frame of one transfer must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    seq_len: u32,
    message_len: u32,
    checksum: u32,
    fragment_len: usize,
}

/// Accumulates fountain frames until the message can be reassembled.
///
/// Frames may arrive in any order and duplicates are harmless. The decoder
/// copies every payload it keeps, so caller buffers are never retained or
/// mutated.
#[derive(Debug, Clone)]
pub struct Decoder {
    header: Option<Header>,
    /// resolved pure fragments, by index
    resolved: BTreeMap<u32, Vec<u8>>,
    /// mixed fragments still depending on 2+ unresolved indexes, keyed by
    /// their sorted basis set
    pending: BTreeMap<Vec<u32>, Vec<u8>>,
    pending_limit: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_pending_limit(DEFAULT_PENDING_LIMIT)
    }

    /// A decoder that stores at most `limit` unresolved mixed fragments.
    pub fn with_pending_limit(limit: usize) -> Self {
        Self {
            header: None,
            resolved: BTreeMap::new(),
            pending: BTreeMap::new(),
            pending_limit: limit,
        }
    }

    /// Feed one received frame.
    ///
    /// The first accepted frame locks the transfer header; later frames
    /// must agree with it. A rejected frame leaves previously accumulated
    /// fragments usable, so the caller can keep feeding frames.
    pub fn add(&mut self, frame: &[u8]) -> Result<()> {
        let fragment = Fragment::from_cbor(frame)?;

        let header = Header {
            seq_len: fragment.seq_len,
            message_len: fragment.message_len,
            checksum: fragment.checksum,
            fragment_len: fragment.payload.len(),
        };
        match self.header {
            None => self.header = Some(header),
            Some(locked) if locked != header => return Err(FountainError::InconsistentFragment),
            Some(_) => {}
        }

        let basis: BTreeSet<u32> =
            choose_fragments(fragment.seq_num, fragment.seq_len, fragment.checksum)
                .into_iter()
                .collect();
        self.reduce(basis, fragment.payload)
    }

    /// Fold a fragment into the accumulated state, cascading any pure
    /// fragments that become newly resolved.
    fn reduce(&mut self, basis: BTreeSet<u32>, payload: Vec<u8>) -> Result<()> {
        let mut work = vec![(basis, payload)];

        while let Some((mut basis, mut payload)) = work.pop() {
            // cancel out every already-resolved index
            let known: Vec<u32> =
                basis.iter().copied().filter(|i| self.resolved.contains_key(i)).collect();
            for index in known {
                xor_into(&mut payload, &self.resolved[&index]);
                basis.remove(&index);
            }

            match basis.len() {
                // fully redundant, nothing new
                0 => continue,
                1 => {
                    let index = *basis.iter().next().expect("basis has one element");
                    debug!(index, resolved = self.resolved.len() + 1, "resolved pure fragment");
                    self.resolved.insert(index, payload);

                    // sweep pending mixtures that depended on it
                    let affected: Vec<Vec<u32>> = self
                        .pending
                        .keys()
                        .filter(|key| key.binary_search(&index).is_ok())
                        .cloned()
                        .collect();
                    for key in affected {
                        let mixed = self.pending.remove(&key).expect("key taken from pending");
                        work.push((key.into_iter().collect(), mixed));
                    }
                }
                _ => {
                    let key: Vec<u32> = basis.iter().copied().collect();
                    // an identical basis carries no new information
                    if self.pending.contains_key(&key) {
                        continue;
                    }
                    if self.pending.len() >= self.pending_limit {
                        return Err(FountainError::TooManyFragments(self.pending_limit));
                    }
                    self.pending.insert(key, payload);
                }
            }
        }
        Ok(())
    }

    /// Fraction of pure fragments resolved so far, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match &self.header {
            Some(header) => self.resolved.len() as f64 / header.seq_len as f64,
            None => 0.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(&self.header, Some(h) if self.resolved.len() as u32 == h.seq_len)
    }

    /// The reassembled message, or `None` while fragments are missing.
    ///
    /// Surfaces a checksum mismatch once all pure fragments are present but
    /// the concatenation fails its CRC.
    pub fn result(&self) -> Result<Option<Vec<u8>>> {
        let Some(header) = &self.header else { return Ok(None) };
        if (self.resolved.len() as u32) < header.seq_len {
            return Ok(None);
        }

        let mut message = Vec::with_capacity(header.fragment_len * header.seq_len as usize);
        for index in 0..header.seq_len {
            message.extend_from_slice(&self.resolved[&index]);
        }
        message.truncate(header.message_len as usize);

        let actual = checksum(&message);
        if actual != header.checksum {
            return Err(FountainError::ChecksumMismatch { expected: header.checksum, actual });
        }
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    struct ReassemblyCase {
        seq_len: u32,
        seq_nums: &'static [u32],
        parts: &'static [&'static str],
        message: &'static str,
    }

    const CASES: &[ReassemblyCase] = &[
        // three pure frames
        ReassemblyCase {
            seq_len: 3,
            seq_nums: &[1, 2, 3],
            parts: &[
                "85010319022b1a2f972da558b95902282320426c756557616c6c6574204d756c74697369672073657475702066696c650a2320746869732066696c6520636f6e7461696e73206f6e6c79207075626c6963206b65797320616e64206973207361666520746f0a23206469737472696275746520616d6f6e6720636f7369676e6572730a230a4e616d653a2073680a506f6c6963793a2032206f6620330a44657269766174696f6e3a206d2f3438272f30272f30272f32270a466f726d61743a2050325753480a",
                "85020319022b1a2f972da558b90a35413038303445333a207870756236463134384c6e6a556847724866454e36506138566b7746384c36464a7159414c78416b75486661636656684d4c5659344d527555564d7872397067754176363744487831594678716f4b4e38733451665a74443973523278524366665471693945384669464c41596b380a0a44443446414445453a207870756236446e656469557559385063633646656a385974325a6e745043794664706248426b4e56374561776573524d626336",
                "85030319022b1a2f972da558b969394d4b4b4d684b4576344a4d4d7a77444a636b615634637a42764e646336696b774c695a716455714d64355a4b5147596151543463584d65566a660a0a39424143443543303a2078707562364565667243724d416475684e776e734862336441733844595a53773466363357795236446145427955486a777650446468637a6a31354679424247347462454a74663476524b5476316e67355350506e57763150766531663135454a66694259356f59444e36564c45430a0a",
            ],
            message: "5902282320426c756557616c6c6574204d756c74697369672073657475702066696c650a2320746869732066696c6520636f6e7461696e73206f6e6c79207075626c6963206b65797320616e64206973207361666520746f0a23206469737472696275746520616d6f6e6720636f7369676e6572730a230a4e616d653a2073680a506f6c6963793a2032206f6620330a44657269766174696f6e3a206d2f3438272f30272f30272f32270a466f726d61743a2050325753480a0a35413038303445333a207870756236463134384c6e6a556847724866454e36506138566b7746384c36464a7159414c78416b75486661636656684d4c5659344d527555564d7872397067754176363744487831594678716f4b4e38733451665a74443973523278524366665471693945384669464c41596b380a0a44443446414445453a207870756236446e656469557559385063633646656a385974325a6e745043794664706248426b4e56374561776573524d62633669394d4b4b4d684b4576344a4d4d7a77444a636b615634637a42764e646336696b774c695a716455714d64355a4b5147596151543463584d65566a660a0a39424143443543303a2078707562364565667243724d416475684e776e734862336441733844595a53773466363357795236446145427955486a777650446468637a6a31354679424247347462454a74663476524b5476316e67355350506e57763150766531663135454a66694259356f59444e36564c45430a0a",
        },
        // high sequence numbers, two pure fragments
        ReassemblyCase {
            seq_len: 2,
            seq_nums: &[1393, 1405, 1409],
            parts: &[
                "85190571021901671a16c6621158b4c36133f5ca04a4efa107339a9e31069fad2b597ce0dab85c2ac34ea8c33b716b56ce8d0e5d196e908b2cd339e572d4b092d55a726ca9b623dfe01699d89d365207dbd6d05be4f0e0791c73fb5fae547df74c39957d21d81616d3d80b2a6f731550356242d31f79d27534ad2060b3bc11667dbfabce24b8515fbd6726ed918d3944a913974a6bbf3260f27b68c786df273de82e727696801112d6d33c14f972761fab67badf8409c53ed198234786e5ecd70e4fd1",
                "8519057d021901671a16c6621158b4c36133f5ca04a4efa107339a9e31069fad2b597ce0dab85c2ac34ea8c33b716b56ce8d0e5d196e908b2cd339e572d4b092d55a726ca9b623dfe01699d89d365207dbd6d05be4f0e0791c73fb5fae547df74c39957d21d81616d3d80b2a6f731550356242d31f79d27534ad2060b3bc11667dbfabce24b8515fbd6726ed918d3944a913974a6bbf3260f27b68c786df273de82e727696801112d6d33c14f972761fab67badf8409c53ed198234786e5ecd70e4fd1",
                "85190581021901671a16c6621158b41a60a22ccb9306eea305b0439f1ea09d5928015de373811605d90131a20100020006d90130a301881830f500f500f502f5021add4fadee0304081a22969377d9012fa602f403582102fb72507fc20ddba92991b17c4bb466130ad93a886e73175033bb43e3bc785a6d04582095b34913937fa5f1c6205b525bb57de1517625e04586b595be68e71362d3edc505d90131a20100020006d90130a301881830f500f500f502f5021a9bacd5c00304081a97ec38f900",
            ],
            message: "d90191d90197a201020283d9012fa602f403582103a9394a2f1a4f99613a716956c8540f6dba6f18931c2639107221b267d740af23045820dbe80cbb4e0e418b06f470d2afe7a8c17be701ab206c59a65e65a824016a6c7005d90131a20100020006d90130a301881830f500f500f502f5021a5a0804e30304081ac7bce7a8d9012fa602f4035821022196adc25fde169fe92e70769059102275d2b40cc98776eaab92b82a86135e92045820438eff7b3b36b6d11a60a22ccb9306eea305b0439f1ea09d5928015de373811605d90131a20100020006d90130a301881830f500f500f502f5021add4fadee0304081a22969377d9012fa602f403582102fb72507fc20ddba92991b17c4bb466130ad93a886e73175033bb43e3bc785a6d04582095b34913937fa5f1c6205b525bb57de1517625e04586b595be68e71362d3edc505d90131a20100020006d90130a301881830f500f500f502f5021a9bacd5c00304081a97ec38f9",
        },
        // mostly mixed frames with cascading resolution
        ReassemblyCase {
            seq_len: 9,
            seq_nums: &[5, 12, 13, 14, 15, 16, 17, 18, 19, 20],
            parts: &[
                "8505091901031aeda0ae73581dd60b3ec4bbff1b9ffe8a9e7240129377b9d3711ed38d412fbb4442256f",
                "850c091901031aeda0ae73581db7808bff2e4ccec832643eed6ff0af2598cfc3e31a52fe92e2e380b829",
                "850d091901031aeda0ae73581d967bd87a541717f538efe54f485b524df71fa3fba8b608a717165b8240",
                "850e091901031aeda0ae73581db1fef1e29ee79c118af6f09c736d28a630240a268d731476c010889334",
                "850f091901031aeda0ae73581df690a82dffe4bf0bb344b560b48b526c8e96ebb8dc5ac74c0f05b1f427",
                "8510091901031aeda0ae73581dee4a760e94d565cdb186ca5f9c79669d58fbd76ace6bd8bfd1937db7bf",
                "8511091901031aeda0ae73581d988d3a03f5afeec0b45e2bd89ad468692090d61c087689dcc0a3636363",
                "8512091901031aeda0ae73581d590100916ec65cf77cadf55cd7f9cda1a1030026ddd42e905b77adc36e",
                "8513091901031aeda0ae73581d287d220470a36cac2a0e8532e97f26a06900bbdfc80c204c8d3ae0c36e",
                "8514091901031aeda0ae73581df8adb7348a03b1ccc0ba7a1942746c51382e8af075774e8ab0b7d9d9fc",
            ],
            message: "590100916ec65cf77cadf55cd7f9cda1a1030026ddd42e905b77adc36e4f2d3ccba44f7f04f2de44f42d84c374a0e149136f25b01852545961d55f7f7a8cde6d0e2ec43f3b2dcb644a2209e8c9e34af5c4747984a5e873c9cf5f965e25ee29039fdf8ca74f1c769fc07eb7ebaec46e0695aea6cbd60b3ec4bbff1b9ffe8a9e7240129377b9d3711ed38d412fbb4442256f1e6f595e0fc57fed451fb0a0101fb76b1fb1e1b88cfdfdaa946294a47de8fff173f021c0e6f65b05c0a494e50791270a0050a73ae69b6725505a2ec8a5791457c9876dd34aadd192a53aa0dc66b556c0c215c7ceb8248b717c22951e65305b56a3706e3e86eb01c803bbf915d80edcd64d4d",
        },
    ];

    #[test]
    fn reassembles_reference_transfers() {
        for case in CASES {
            let mut decoder = Decoder::new();
            for part in case.parts {
                decoder.add(&hex::decode(part).unwrap()).unwrap();
            }

            let message = decoder.result().unwrap().expect("enough fragments to decode");
            assert_eq!(hex::encode(&message), case.message);
            assert!(decoder.is_complete());

            // the same frames must re-encode byte-identically
            for (seq_num, part) in case.seq_nums.iter().zip(case.parts) {
                assert_eq!(hex::encode(encode(&message, *seq_num, case.seq_len)), **part);
            }
        }
    }

    #[test]
    fn any_sufficient_subset_decodes() {
        let message: Vec<u8> = (0..157u8).collect();
        let mut decoder = Decoder::new();

        // skip the pure frames entirely, feed mixed ones until done
        let mut seq_num = 6;
        while !decoder.is_complete() {
            decoder.add(&encode(&message, seq_num, 5)).unwrap();
            seq_num += 1;
            assert!(seq_num < 200, "decoder failed to converge");
        }
        assert_eq!(decoder.result().unwrap().unwrap(), message);
    }

    #[test]
    fn duplicate_frames_are_idempotent() {
        let message = b"idempotent under duplication".to_vec();
        let frame = encode(&message, 1, 3);

        let mut once = Decoder::new();
        once.add(&frame).unwrap();

        let mut twice = Decoder::new();
        twice.add(&frame).unwrap();
        twice.add(&frame).unwrap();

        assert_eq!(once.resolved, twice.resolved);
        assert_eq!(once.pending, twice.pending);
    }

    #[test]
    fn out_of_order_arrival_decodes() {
        let message: Vec<u8> = (0..100u8).rev().collect();
        let mut decoder = Decoder::new();
        for seq_num in [4, 1, 3, 2] {
            decoder.add(&encode(&message, seq_num, 4)).unwrap();
        }
        assert_eq!(decoder.result().unwrap().unwrap(), message);
    }

    #[test]
    fn rejects_inconsistent_header() {
        let message = b"one transfer at a time".to_vec();
        let other = b"an entirely different message".to_vec();

        let mut decoder = Decoder::new();
        decoder.add(&encode(&message, 1, 3)).unwrap();
        assert_eq!(
            decoder.add(&encode(&other, 1, 3)),
            Err(FountainError::InconsistentFragment)
        );

        // state survives the rejection
        decoder.add(&encode(&message, 2, 3)).unwrap();
        decoder.add(&encode(&message, 3, 3)).unwrap();
        assert_eq!(decoder.result().unwrap().unwrap(), message);
    }

    #[test]
    fn surfaces_checksum_mismatch() {
        let message = b"checksummed payload".to_vec();
        let mut tampered = Fragment::from_cbor(&encode(&message, 1, 2)).unwrap();
        tampered.payload[0] ^= 0xFF;

        let mut decoder = Decoder::new();
        decoder.add(&tampered.to_cbor()).unwrap();
        decoder.add(&encode(&message, 2, 2)).unwrap();

        assert!(matches!(
            decoder.result(),
            Err(FountainError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn enforces_pending_limit() {
        let message: Vec<u8> = (0..200u8).collect();
        let mut decoder = Decoder::with_pending_limit(2);

        // feed only mixed frames so nothing resolves and distinct basis
        // sets pile up
        let mut hit_limit = false;
        for seq_num in 21..200 {
            match decoder.add(&encode(&message, seq_num, 20)) {
                Ok(()) => {}
                Err(FountainError::TooManyFragments(2)) => {
                    hit_limit = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(hit_limit);
    }

    #[test]
    fn progress_reports_resolution() {
        let message: Vec<u8> = (0..40u8).collect();
        let mut decoder = Decoder::new();
        assert_eq!(decoder.progress(), 0.0);

        decoder.add(&encode(&message, 1, 4)).unwrap();
        assert_eq!(decoder.progress(), 0.25);
        assert_eq!(decoder.result().unwrap(), None);

        for seq_num in 2..=4 {
            decoder.add(&encode(&message, seq_num, 4)).unwrap();
        }
        assert_eq!(decoder.progress(), 1.0);
    }

    #[test]
    fn single_fragment_transfer() {
        let message = b"fits in one frame".to_vec();
        let mut decoder = Decoder::new();
        decoder.add(&encode(&message, 1, 1)).unwrap();
        assert_eq!(decoder.result().unwrap().unwrap(), message);
    }
}
