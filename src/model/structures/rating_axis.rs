use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::{Display, EnumIter};

/// The three axes a photo is rated on.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum RatingAxis {
    Attraction = 0,
    Trust = 1,
    Intelligence = 2
}

#[cfg(test)]
mod tests {
    use crate::model::structures::rating_axis::RatingAxis;
    use strum::IntoEnumIterator;

    #[test]
    fn test_enumerate() {
        let axes = RatingAxis::iter().collect::<Vec<_>>();
        assert_eq!(axes, vec![RatingAxis::Attraction, RatingAxis::Trust, RatingAxis::Intelligence]);
    }

    #[test]
    fn test_display() {
        assert_eq!(RatingAxis::Attraction.to_string(), "Attraction");
    }
}
