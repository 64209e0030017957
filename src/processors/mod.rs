pub mod bitcrusher;
pub mod delay_chorus;
pub mod envgen;
pub mod filter;
pub mod freeverb;
pub mod looper;
pub mod oscillators;
pub mod phaser;
pub mod sample_player;
pub mod stream;
pub mod utility;

pub use bitcrusher::Bitcrusher;
pub use delay_chorus::{Chorus, Delay};
pub use envgen::Envgen;
pub use filter::Filter;
pub use freeverb::Freeverb;
pub use looper::Looper;
pub use oscillators::{Debug, Oscillator, Waveform};
pub use phaser::Phaser;
pub use sample_player::SamplePlayer;
pub use stream::Stream;
pub use utility::{Force, Gaincomp, Panning, Pitch, Volume};
