use rand::{distributions::Uniform, Rng};

const REFERRAL_CODE_LENGTH: usize = 8;
// No 0/O or 1/I, so codes can be read out over the phone.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn new_referral_code() -> String {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..ALPHABET.len());
    (0..REFERRAL_CODE_LENGTH).map(|_| ALPHABET[rng.sample(dist)] as char).collect()
}
