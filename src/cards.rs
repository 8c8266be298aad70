//! Card encoding, parsing and formatting.
//!
//! Cards are encoded as `card_id = 13 * suit + rank` where:
//! - rank: 0 (deuce) to 12 (ace)
//! - suit: 0-3 (clubs, diamonds, hearts, spades)
//!
//! Text form is two characters, e.g. "As", "Kh", "2c".

use crate::error::{SolverError, SolverResult};

/// A card encoded as `13 * suit + rank` (0-51).
pub type Card = u8;

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];
const SUIT_CHARS: [char; 4] = ['c', 'd', 'h', 's'];

/// Extract rank (0-12) from a card.
#[inline]
pub fn rank(card: Card) -> u8 {
    card % 13
}

/// Extract suit (0-3) from a card.
#[inline]
pub fn suit(card: Card) -> u8 {
    card / 13
}

/// Create a card from rank (0-12) and suit (0-3).
#[inline]
pub fn make_card(rank: u8, suit: u8) -> Card {
    suit * 13 + rank
}

/// Parse a single card from its 2-character text form.
pub fn parse_card(s: &str) -> SolverResult<Card> {
    let mut chars = s.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(r), Some(su), None) => card_from_chars(r, su)
            .ok_or_else(|| SolverError::InvalidCard(s.to_string())),
        _ => Err(SolverError::InvalidCard(s.to_string())),
    }
}

fn card_from_chars(rank_char: char, suit_char: char) -> Option<Card> {
    let rank = RANK_CHARS.iter().position(|&c| c == rank_char)?;
    let suit = SUIT_CHARS.iter().position(|&c| c == suit_char)?;
    Some(make_card(rank as u8, suit as u8))
}

/// Format a card for display (e.g. "As", "Kh", "2c").
pub fn card_to_string(card: Card) -> String {
    let r = rank(card) as usize;
    let s = suit(card) as usize;
    format!("{}{}", RANK_CHARS[r], SUIT_CHARS[s])
}

/// Parse a two-card hand like "AsKd". Cards are returned in ascending order.
pub fn parse_hand(s: &str) -> SolverResult<[Card; 2]> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() != 4 {
        return Err(SolverError::InvalidCard(format!(
            "Hand must be 4 chars like AsKd: {}",
            s
        )));
    }
    let invalid = || SolverError::InvalidCard(s.to_string());
    let c1 = card_from_chars(chars[0], chars[1]).ok_or_else(invalid)?;
    let c2 = card_from_chars(chars[2], chars[3]).ok_or_else(invalid)?;
    if c1 == c2 {
        return Err(SolverError::InvalidCard(format!(
            "Hand has duplicate card: {}",
            s
        )));
    }
    if c1 < c2 {
        Ok([c1, c2])
    } else {
        Ok([c2, c1])
    }
}

/// Format a two-card hand as its 4-character text form.
pub fn hand_to_string(cards: [Card; 2]) -> String {
    format!("{}{}", card_to_string(cards[0]), card_to_string(cards[1]))
}

/// Parse a board string like "KsTh7s4d2s" or "Ks Th 7s 4d 2s".
pub fn parse_board(s: &str) -> SolverResult<Vec<Card>> {
    let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() % 2 != 0 {
        return Err(SolverError::InvalidBoard(format!(
            "Board string must pair up into cards: {}",
            s
        )));
    }

    let mut cards = Vec::with_capacity(chars.len() / 2);
    for pair in chars.chunks(2) {
        let card = card_from_chars(pair[0], pair[1]).ok_or_else(|| {
            SolverError::InvalidCard(format!("{}{}", pair[0], pair[1]))
        })?;
        cards.push(card);
    }

    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            if cards[i] == cards[j] {
                return Err(SolverError::InvalidBoard(format!(
                    "Duplicate card on board: {}",
                    card_to_string(cards[i])
                )));
            }
        }
    }

    Ok(cards)
}

/// Format a board as a compact string.
pub fn board_to_string(cards: &[Card]) -> String {
    cards.iter().map(|&c| card_to_string(c)).collect()
}
