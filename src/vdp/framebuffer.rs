/// Framebuffer do VDP: o quadro ativo em ARGB8888 (`0xAARRGGBB`).
/// O tamanho acompanha o modo de vídeo (320/256 × 224/240, altura dobrada
/// no entrelaçado de resolução dupla).
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Cria um novo framebuffer limpo (preto).
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0xFF00_0000; width * height],
        }
    }

    /// Redimensiona apenas se a geometria mudou.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn line_mut(&mut self, y: usize) -> Option<&mut [u32]> {
        if y < self.height {
            let start = y * self.width;
            Some(&mut self.pixels[start..start + self.width])
        } else {
            None
        }
    }

    /// Bytes RGBA8 em ordem de linha, prontos para um encoder de imagem.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let [a, r, g, b] = pixel.to_be_bytes();
            bytes.extend_from_slice(&[r, g, b, a]);
        }
        bytes
    }
}
