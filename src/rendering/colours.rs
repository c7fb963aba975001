use image::Rgb;

/// Box and tag colour for a class name.
pub fn get_class_colour(label_name: &str) -> Rgb<u8> {
    match label_name {
        "free_parking_space" => Rgb([0, 200, 0]),             // green
        "not_free_parking_space" => Rgb([220, 0, 0]),         // red
        "partially_free_parking_space" => Rgb([255, 140, 0]), // orange
        _ => Rgb([0, 0, 255])                                 // blue (anything else)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_are_blue() {
        assert_eq!(get_class_colour("free_parking_space"), Rgb([0, 200, 0]));
        assert_eq!(get_class_colour("bicycle"), Rgb([0, 0, 255]));
    }
}
