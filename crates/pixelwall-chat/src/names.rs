use rand::Rng;

/// Word lists for suggested guest names. Carried over unchanged so the
/// flavor of the room stays the same.
const ADJECTIVES: &[&str] = &[
    "cosmic", "dusty", "frozen", "hollow", "liquid", "neon", "rusty",
    "silent", "smoky", "wired", "broken", "chrome", "digital", "electric",
    "faded", "ghost", "glitch", "hyper", "indie", "jazzy", "kinetic",
    "lunar", "murky", "nocturnal", "orbital", "phantom", "quantum", "radical",
    "static", "turbo", "ultra", "vapor", "warped", "xenon", "yellow", "zero",
];

const NOUNS: &[&str] = &[
    "bass", "beat", "cipher", "crate", "deck", "drone", "echo", "fader",
    "flip", "freq", "gate", "grid", "groove", "house", "loop", "lyric",
    "mixer", "node", "pitch", "plug", "rack", "riff", "sample", "scratch",
    "signal", "slap", "snare", "static", "stomp", "synth", "tape", "track",
    "vinyl", "vox", "warp", "wave", "wire", "zone",
];

/// A fresh "adjective-noun-NN" suggestion, e.g. `neon-groove-42`.
pub fn guest_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    format!("{}-{}-{}", adjective, noun, rng.random_range(10..100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_names_have_the_expected_shape() {
        for _ in 0..50 {
            let name = guest_name();
            let parts: Vec<&str> = name.rsplitn(2, '-').collect();
            let number: u32 = parts[0].parse().expect("numeric suffix");
            assert!((10..=99).contains(&number));

            let (adjective, noun) = parts[1].split_once('-').expect("two words");
            assert!(ADJECTIVES.contains(&adjective));
            assert!(NOUNS.contains(&noun));
        }
    }
}
