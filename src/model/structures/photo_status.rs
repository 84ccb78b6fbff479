use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;
use strum_macros::EnumIter;

#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[repr(u8)]
pub enum PhotoStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
    Expired = 3
}

impl TryFrom<i32> for PhotoStatus {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PhotoStatus::Pending),
            1 => Ok(PhotoStatus::Approved),
            2 => Ok(PhotoStatus::Rejected),
            3 => Ok(PhotoStatus::Expired),
            _ => Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::structures::photo_status::PhotoStatus;
    use strum::IntoEnumIterator;

    #[test]
    fn test_convert_approved() {
        assert_eq!(PhotoStatus::try_from(1), Ok(PhotoStatus::Approved));
    }

    #[test]
    fn test_convert_invalid() {
        assert_eq!(PhotoStatus::try_from(4), Err(()));
    }

    #[test]
    fn test_enumerate() {
        let statuses = PhotoStatus::iter().collect::<Vec<_>>();
        assert_eq!(
            statuses,
            vec![
                PhotoStatus::Pending,
                PhotoStatus::Approved,
                PhotoStatus::Rejected,
                PhotoStatus::Expired
            ]
        );
    }
}
