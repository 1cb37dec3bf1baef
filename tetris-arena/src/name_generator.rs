/// Display name generation for players who did not pick one
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Training data, a mix of short nicknames
const TRAINING_NAMES: &[&str] = &[
    "Alexey", "Vadim", "Pajitnov", "Gerasimov", "Dmitry", "Elena", "Mila", "Sasha",
    "Boris", "Katya", "Yuri", "Nadia", "Oleg", "Vera", "Pavel", "Irina",
    "Tetra", "Mino", "Blok", "Kvadrat", "Linia", "Zeta", "Omega", "Theta",
    "Korobeiniki", "Kalinka", "Troika", "Volga", "Neva", "Ural", "Amur", "Oka",
];

/// Names shorter than this are too ambiguous on a scoreboard
const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 12;

fn create_name_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a pronounceable random display name (letters only)
pub fn generate_random_name() -> String {
    let mut generator = create_name_generator();
    loop {
        let name = generator.generate_one();
        if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len())
            && name.chars().all(|c| c.is_alphabetic())
        {
            return name;
        }
    }
}
