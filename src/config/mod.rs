mod settings;

pub use settings::PubSubSettings;
