//! Deterministic sample data: short remembrance messages with jittered
//! timestamps spread over the last sixty days, so the similarity ranking
//! has real temporal structure out of the box.

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use lantern_core::THIRTY_DAYS_SECS;
use lantern_store::MessageStore;

const SAMPLE_MESSAGES: &[&str] = &[
    "I still make your recipe every Sunday. The kitchen smells like you.",
    "You taught me to whistle the summer I turned seven. I still can't stop.",
    "Miss you, Dad.",
    "We scattered your ashes by the lighthouse. The gulls came, like you said they would.",
    "Your garden bloomed again this spring. The roses came back without you.",
    "I wore your watch to the interview. I got the job.",
    "Thank you for every bedtime story. I read them to my daughter now.",
    "The dog still waits by the door at five.",
    "I finally finished the boat. She floats, Grandpa. She really floats.",
    "You would have laughed so hard at the wedding. We saved you a seat.",
    "Every time it rains I think of you dancing in the parking lot.",
    "I forgive you. I hope you knew that before the end.",
    "Your handwriting in the margins of every book. I can't give them away.",
    "One year today. The coffee still tastes wrong without you across the table.",
    "You were the bravest person I ever knew, and you never once believed it.",
    "I kept the voicemail. Sometimes I just need to hear you say my name.",
    "The orchard we planted gave fruit this year. First apples. They were sweet.",
    "I told the kids about the time you drove the tractor into the pond.",
    "Grandma, the quilt still smells like lavender.",
    "You never met her, but she has your eyes. We named her after you.",
    "I sold the house. I'm sorry. I kept the door frame with our heights on it.",
    "Happy birthday, Mum. Seventy-one today. I lit the candles anyway.",
    "The band played your song at the festival. Everyone sang. You were everywhere.",
    "Rest easy, old friend. The mountain is still there. I climb it for both of us.",
];

/// Insert `count` sample messages, backdated by up to two thirty-day
/// windows so temporal proximity varies. Same seed, same data.
pub fn run(store: &MessageStore, count: usize, seed: u64) -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let now = chrono::Utc::now().timestamp();

    for i in 0..count {
        let content = SAMPLE_MESSAGES[i % SAMPLE_MESSAGES.len()];
        let age = rng.random_range(0..=2 * THIRTY_DAYS_SECS);
        store
            .insert_at(content, now - age)
            .map_err(|e| anyhow::anyhow!("seed insert failed: {e}"))?;
    }

    println!("seeded {count} messages");
    Ok(())
}
