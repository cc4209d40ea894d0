/// Trial-division primality test.
///
/// Values `<= 1` are not prime. Otherwise every divisor in `[2, floor(sqrt(n))]`
/// is tried and the first hit short-circuits. Pure and allocation-free, so it is
/// called from worker threads without any synchronization.
#[inline]
pub fn is_prime(n: i32) -> bool {
    if n <= 1 {
        return false;
    }

    let n = n as u32;
    let mut divisor = 2u32;
    // `divisor <= n / divisor` is `divisor * divisor <= n` without overflow
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_and_one_are_not_prime() {
        for n in [i32::MIN, -7, -2, -1, 0, 1] {
            assert!(!is_prime(n), "{} should not be prime", n);
        }
    }

    #[test]
    fn test_small_primes() {
        let primes: Vec<i32> = (0..50).filter(|&n| is_prime(n)).collect();
        assert_eq!(
            primes,
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]
        );
    }

    #[test]
    fn test_prime_squares_are_composite() {
        for p in [2, 3, 5, 7, 11, 13, 31_991] {
            assert!(!is_prime(p * p));
        }
    }

    #[test]
    fn test_largest_values() {
        // 2^31 - 1 is a Mersenne prime
        assert!(is_prime(i32::MAX));
        assert!(!is_prime(i32::MAX - 1));
        assert!(is_prime(31_991));
        assert!(!is_prime(31_999));
    }
}
