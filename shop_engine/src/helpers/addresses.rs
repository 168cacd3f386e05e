use regex::Regex;

use crate::{db_types::NewAddress, shop_api::errors::ShopError};

const PHONE_PATTERN: &str = r"^\+?[0-9]{10,13}$";
const PINCODE_PATTERN: &str = r"^[1-9][0-9]{5}$";

fn matches(pattern: &str, value: &str) -> Result<bool, ShopError> {
    let re = Regex::new(pattern).map_err(|e| ShopError::Validation(format!("Invalid pattern {pattern}: {e}")))?;
    Ok(re.is_match(value))
}

/// Checks that every field of an address is filled in, and that the phone number and postal code look plausible.
pub fn validate_address(address: &NewAddress) -> Result<(), ShopError> {
    if let Some(field) = address.missing_field() {
        return Err(ShopError::Validation(format!("Address {field} is required")));
    }
    let phone = address.phone.replace([' ', '-'], "");
    if !matches(PHONE_PATTERN, &phone)? {
        return Err(ShopError::Validation(format!("{} is not a valid phone number", address.phone)));
    }
    if !matches(PINCODE_PATTERN, address.pincode.trim())? {
        return Err(ShopError::Validation(format!("{} is not a valid pincode", address.pincode)));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn address() -> NewAddress {
        NewAddress {
            name: "Asha".into(),
            phone: "98450 12345".into(),
            locality: "Indiranagar".into(),
            district: "Bengaluru".into(),
            state: "Karnataka".into(),
            pincode: "560038".into(),
        }
    }

    #[test]
    fn valid_address() {
        assert!(validate_address(&address()).is_ok());
        let mut a = address();
        a.phone = "+91-9845012345".into();
        assert!(validate_address(&a).is_ok());
    }

    #[test]
    fn invalid_addresses() {
        let mut a = address();
        a.state = " ".into();
        assert_eq!(validate_address(&a).unwrap_err().to_string(), "Address state is required");
        let mut a = address();
        a.phone = "12345".into();
        assert!(validate_address(&a).is_err());
        let mut a = address();
        a.pincode = "056003".into();
        assert!(validate_address(&a).is_err());
        a.pincode = "5600381".into();
        assert!(validate_address(&a).is_err());
    }
}
