use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;

#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TestType {
    Free = 0,
    Paid = 1
}

impl TryFrom<i32> for TestType {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TestType::Free),
            1 => Ok(TestType::Paid),
            _ => Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::structures::test_type::TestType;

    #[test]
    fn test_convert_free() {
        assert_eq!(TestType::try_from(0), Ok(TestType::Free));
    }

    #[test]
    fn test_convert_paid() {
        assert_eq!(TestType::try_from(1), Ok(TestType::Paid));
    }

    #[test]
    fn test_convert_invalid() {
        assert_eq!(TestType::try_from(2), Err(()));
    }
}
