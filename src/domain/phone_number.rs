use std::fmt::Debug;

use phonenumber::{country, Mode};

#[derive(Debug, Clone)]
pub struct PhoneNumberDomain(pub String);

impl PhoneNumberDomain{
    // Numbers without a `+` prefix are read as local to `region`
    pub fn parse(number: String, region: &str) -> Result<PhoneNumberDomain, String>{
        let country_id = region.parse::<country::Id>().ok();

        match phonenumber::parse(country_id, number.trim()) {
            Ok(parsed) if phonenumber::is_valid(&parsed) => {
                Ok(Self(parsed.format().mode(Mode::E164).to_string()))
            },
            _ => Err(format!("{} is not a valid phone number", number))
        }
    }

    pub fn inner(&self) -> String {
        self.0.clone()
    }
}

impl std::fmt::Display for PhoneNumberDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
