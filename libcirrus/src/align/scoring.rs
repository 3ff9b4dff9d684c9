use serde::Serialize;

/// A score in natural log units.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Nats(pub f32);

impl Nats {
    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn to_bits(self) -> Bits {
        Bits(self.0 / std::f32::consts::LN_2)
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl std::fmt::Debug for Nats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nats({})", self.0)
    }
}

impl std::ops::Add for Nats {
    type Output = Nats;

    fn add(self, rhs: Self) -> Self::Output {
        Nats(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Nats {
    type Output = Nats;

    fn sub(self, rhs: Self) -> Self::Output {
        Nats(self.0 - rhs.0)
    }
}

impl std::ops::Sub<Bits> for Nats {
    type Output = Nats;

    fn sub(self, rhs: Bits) -> Self::Output {
        self - rhs.to_nats()
    }
}

/// A score in log base 2 units.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Bits(pub f32);

impl Bits {
    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn to_nats(self) -> Nats {
        Nats(self.0 * std::f32::consts::LN_2)
    }
}

impl std::fmt::Debug for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bits({})", self.0)
    }
}

impl std::ops::Add for Bits {
    type Output = Bits;

    fn add(self, rhs: Self) -> Self::Output {
        Bits(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Bits {
    type Output = Bits;

    fn sub(self, rhs: Self) -> Self::Output {
        Bits(self.0 - rhs.0)
    }
}

/// The score of a target of the given length under the single-state null model.
pub fn null_one_score(target_length: usize) -> Nats {
    let p1 = (target_length as f32) / (target_length as f32 + 1.0);
    Nats(target_length as f32 * p1.ln() + (1.0 - p1).ln())
}

/// The log-odds score of a forward score against the null model, in bits.
pub fn bit_score(forward_score: Nats, target_length: usize) -> Bits {
    (forward_score - null_one_score(target_length)).to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn test_nats_ops() {
        check!((Nats(10.0) + Nats(10.0)).value() == 20.0);
        check!((Nats(20.0) - Nats(10.0)).value() == 10.0);
    }

    #[test]
    fn test_bits_ops() {
        check!((Bits(10.0) + Bits(10.0)).value() == 20.0);
        check!((Bits(20.0) - Bits(10.0)).value() == 10.0);
    }

    #[test]
    fn test_nats_bits_conversion() {
        let nats = Nats(std::f32::consts::LN_2 * 3.0);
        check!((nats.to_bits().value() - 3.0).abs() < 1e-6);
        check!((Bits(3.0).to_nats().value() - nats.value()).abs() < 1e-6);
        check!(((Nats(1.0) - Bits(1.0)).value() - (1.0 - std::f32::consts::LN_2)).abs() < 1e-6);
    }

    #[test]
    fn test_null_one_score() {
        // L * ln(L / (L + 1)) + ln(1 / (L + 1))
        let expected = 4.0 * (4.0f32 / 5.0).ln() + (1.0f32 / 5.0).ln();
        check!((null_one_score(4).value() - expected).abs() < 1e-5);

        let bits = bit_score(null_one_score(4), 4);
        check!(bits.value().abs() < 1e-6);
    }
}
