//! FM tone definitions

/// Number of values in a tone block: algorithm, feedback and 4 x 10 operator values
pub const TONE_PARAMETER_COUNT: usize = 42;

/// Values per operator in a tone block
const OPERATOR_STRIDE: usize = 10;

/// One FM operator bank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FmOperator {
    pub attack_rate: i32,
    pub decay_rate: i32,
    pub sustain_rate: i32,
    pub release_rate: i32,
    pub sustain_level: i32,
    pub output_level: i32,
    pub key_scale: i32,
    pub multiple: i32,
    pub detune: i32,
    pub amplitude_modulation: i32,
}

/// A resolved FM instrument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FmTone {
    pub algorithm: i32,
    pub feedback: i32,
    pub operators: [FmOperator; 4],
}

impl FmTone {
    /// Build a tone from a raw tone-block parameter list.
    ///
    /// Layout: `alg, fb`, then per operator
    /// `AR, DR, SR, RR, SL, OL, KS, ML, DT, AM`.
    pub fn from_parameters(values: &[i32]) -> Option<Self> {
        if values.len() < TONE_PARAMETER_COUNT {
            return None;
        }

        let mut tone = FmTone {
            algorithm: values[0],
            feedback: values[1],
            operators: [FmOperator::default(); 4],
        };

        for (i, op) in tone.operators.iter_mut().enumerate() {
            let p = &values[i * OPERATOR_STRIDE + 2..(i + 1) * OPERATOR_STRIDE + 2];
            *op = FmOperator {
                attack_rate: p[0],
                decay_rate: p[1],
                sustain_rate: p[2],
                release_rate: p[3],
                sustain_level: p[4],
                output_level: p[5],
                key_scale: p[6],
                multiple: p[7],
                detune: p[8],
                amplitude_modulation: p[9],
            };
        }

        Some(tone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_layout() {
        let values: Vec<i32> = (0..TONE_PARAMETER_COUNT as i32).collect();
        let tone = FmTone::from_parameters(&values).unwrap();
        assert_eq!(tone.algorithm, 0);
        assert_eq!(tone.feedback, 1);
        assert_eq!(tone.operators[0].attack_rate, 2);
        assert_eq!(tone.operators[0].amplitude_modulation, 11);
        assert_eq!(tone.operators[3].attack_rate, 32);
        assert_eq!(tone.operators[3].output_level, 37);
        assert_eq!(tone.operators[3].amplitude_modulation, 41);
    }

    #[test]
    fn test_short_parameter_list() {
        assert!(FmTone::from_parameters(&[4, 7, 31]).is_none());
    }
}
